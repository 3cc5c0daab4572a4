//! HTML rendering of diff segments.
//!
//! Changed spans are marked with `<span class="diff-del">` on the original side and
//! `<span class="diff-add">` on the modified side. Marking never escapes text, so a
//! marked string is markup. The display boundary applies one rule to every cell: a
//! cell containing the [`MARKER`] substring is passed through as markup, any other
//! cell is HTML-escaped. [`marked_table_html`] renders wire-format segments under
//! that rule. [`side_html`] renders straight from spans and escapes the text inside
//! markers as well; [`table_html`] uses it.

use crate::segment::{DiffSegment, MarkedSegment, Side};
use std::fmt::Write as _;

/// Substring present in every marked string.
pub const MARKER: &str = "<span";

/// Shown in place of the table when the documents have no differences.
pub const NO_DIFFERENCES_HTML: &str =
    r#"<div class="diff-empty">No differences found. The documents are identical.</div>"#;

/// How a changed span is marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    /// Content only in the original document.
    Deleted,
    /// Content only in the modified document.
    Added,
}

impl Mark {
    /// CSS class of the marker element.
    #[must_use]
    pub fn class(self) -> &'static str {
        match self {
            Self::Deleted => "diff-del",
            Self::Added => "diff-add",
        }
    }

    /// Wraps `text` verbatim in this marker.
    #[must_use]
    pub fn wrap(self, text: &str) -> String {
        format!(r#"<span class="{}">{text}</span>"#, self.class())
    }
}

/// Escapes `&`, `<` and `>` for use as HTML text content.
#[inline]
#[must_use]
pub fn escape_html(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

/// Prepares one marked-string cell for display.
///
/// Cells carrying a marker pass through untouched, plain cells are escaped.
/// Newlines become `<br>` either way.
#[must_use]
pub fn cell_html(text: &str) -> String {
    let body = if text.contains(MARKER) {
        text.to_string()
    } else {
        escape_html(text)
    };
    body.replace('\n', "<br>")
}

/// Renders a side from its spans, escaping all text and marking changed spans.
#[must_use]
pub fn side_html(side: &Side, mark: Mark) -> String {
    side.join(|span| {
        let text = escape_html(&span.text);
        if span.changed {
            mark.wrap(&text)
        } else {
            text
        }
    })
    .replace('\n', "<br>")
}

/// Renders the two-column comparison table, or a "no differences" notice when
/// there is nothing to show.
#[must_use]
pub fn table_html(segments: &[DiffSegment]) -> String {
    rows_table(segments.iter().map(|segment| {
        (
            side_html(&segment.original, Mark::Deleted),
            side_html(&segment.modified, Mark::Added),
        )
    }))
}

/// Renders the comparison table from wire-format segments, passing each cell
/// through [`cell_html`].
#[must_use]
pub fn marked_table_html(segments: &[MarkedSegment]) -> String {
    rows_table(
        segments
            .iter()
            .map(|segment| (cell_html(&segment.original), cell_html(&segment.modified))),
    )
}

fn rows_table(cells: impl Iterator<Item = (String, String)>) -> String {
    let mut rows = String::new();
    for (original, modified) in cells {
        let _ = write!(
            rows,
            r#"<tr><td class="diff-cell">{original}</td><td class="diff-cell">{modified}</td></tr>"#,
        );
    }
    if rows.is_empty() {
        return NO_DIFFERENCES_HTML.to_string();
    }

    format!(
        concat!(
            r#"<div class="diff-container"><table class="diff-table">"#,
            "<thead><tr><th>Original Document</th><th>Modified Document</th></tr></thead>",
            "<tbody>{}</tbody></table></div>"
        ),
        rows
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::segments;
    use pretty_assertions::assert_eq;

    #[test]
    fn marks_wrap_verbatim() {
        assert_eq!(Mark::Deleted.wrap("a&b"), r#"<span class="diff-del">a&b</span>"#);
        assert_eq!(Mark::Added.wrap(""), r#"<span class="diff-add"></span>"#);
    }

    #[test]
    fn plain_cells_are_escaped() {
        assert_eq!(
            cell_html("if a < b && c\nthen"),
            "if a &lt; b &amp;&amp; c<br>then"
        );
    }

    #[test]
    fn marked_cells_pass_through() {
        let marked = r#"x <span class="diff-add">y</span>"#;
        assert_eq!(cell_html(marked), marked);
    }

    #[test]
    fn side_html_escapes_inside_markers() {
        let segs: Vec<_> = segments("a <b> c", "a <i> c").collect();
        assert_eq!(
            side_html(&segs[0].original, Mark::Deleted),
            r#"a <span class="diff-del">&lt;b&gt;</span> c"#
        );
        assert_eq!(
            side_html(&segs[0].modified, Mark::Added),
            r#"a <span class="diff-add">&lt;i&gt;</span> c"#
        );
    }

    #[test]
    fn empty_comparison_renders_notice() {
        assert_eq!(table_html(&[]), NO_DIFFERENCES_HTML);
    }

    #[test]
    fn table_has_one_row_per_segment() {
        let segs: Vec<_> = segments("one\ntwo", "one\n2").collect();
        let html = table_html(&segs);
        assert_eq!(html.matches("<tr>").count(), 3);
        assert!(html.contains("<th>Original Document</th>"));
        assert!(html.contains(r#"<td class="diff-cell"><span class="diff-add">2</span></td>"#));
    }

    #[test]
    fn marked_table_escapes_only_plain_cells() {
        let wire = vec![
            MarkedSegment {
                kind: "equal",
                original: "a < b\nc".to_string(),
                modified: "a < b\nc".to_string(),
            },
            MarkedSegment {
                kind: "insert",
                original: String::new(),
                modified: r#"<span class="diff-add">new</span>"#.to_string(),
            },
        ];
        let html = marked_table_html(&wire);
        assert!(html.contains(r#"<td class="diff-cell">a &lt; b<br>c</td>"#));
        assert!(html.contains(r#"<td class="diff-cell"><span class="diff-add">new</span></td>"#));
        assert_eq!(html.matches("<tr>").count(), 3);
        assert_eq!(marked_table_html(&[]), NO_DIFFERENCES_HTML);
    }

    #[test]
    fn both_tables_agree_on_safe_text() {
        let segs: Vec<_> = segments("one\ntwo", "one\n2").collect();
        let wire: Vec<_> = segs.iter().map(DiffSegment::to_marked).collect();
        assert_eq!(marked_table_html(&wire), table_html(&segs));
    }
}
