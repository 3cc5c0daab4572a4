//! Building display-ready diff segments from two documents.
//!
//! This module turns a line alignment into the segments a side-by-side table shows.
//! Unchanged, inserted and deleted line blocks are passed through whole; replaced
//! blocks are refined word by word so the viewer can point at exactly what changed.
//!
//! ## Processing Flow
//!
//! 1. Both documents are split into lines and aligned with [`Matcher`]
//! 2. [`segments`] walks the opcodes lazily, yielding one [`DiffSegment`] per opcode
//! 3. `Equal` blocks become unchanged spans on both sides
//! 4. `Insert`/`Delete` blocks become a single changed span on one side
//! 5. `Replace` blocks are handed to [`refine`](crate::refine::refine)
//!
//! ## Content Representation
//!
//! Segment content is a list of `(text, changed)` spans rather than markup. The
//! [`render`](crate::render) module decides how changed spans are marked.

use crate::align::{Matcher, Opcode, Tag};
use crate::refine::refine;
use crate::render::Mark;
use serde::Serialize;
use smallvec::SmallVec;
use thiserror::Error;

/// Most sides hold one span, a refined line rarely more than a handful; inline
/// storage avoids heap allocation for the common case.
pub type Spans = SmallVec<[Span; 3]>;

/// Characters that end a line. `\r\n` counts as a single break.
#[inline]
fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}

/// Splits a document into lines, or an empty vector for empty input.
///
/// Besides `\n` and `\r\n`, a lone `\r`, vertical tab, form feed, the ASCII
/// file/group/record separators, NEL and the Unicode line and paragraph separators
/// all end a line. A break at the very end does not add an empty line.
#[must_use]
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&text[start..i]);
        start = i + c.len_utf8();
        if c == '\r' && chars.next_if(|&(_, next)| next == '\n').is_some() {
            start += 1;
        }
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }

    lines
}

/// A run of text that is either unchanged or changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Words of the run joined by single spaces, or whole lines for unrefined blocks.
    pub text: String,

    /// Whether the run differs from the other document.
    pub changed: bool,
}

impl Span {
    #[inline]
    #[must_use]
    pub fn unchanged(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            changed: false,
        }
    }

    #[inline]
    #[must_use]
    pub fn changed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            changed: true,
        }
    }
}

/// One side (original or modified) of a diff segment.
///
/// An empty side has no spans at all. A side holding a single changed span with
/// empty text is not empty: it marks a blank line that was removed or added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Side {
    pub spans: Spans,
}

impl Side {
    /// Creates a side with no content.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a side whose whole content is unchanged.
    #[inline]
    #[must_use]
    pub fn unchanged(text: impl Into<String>) -> Self {
        Self {
            spans: smallvec::smallvec![Span::unchanged(text)],
        }
    }

    /// Creates a side whose whole content is changed.
    ///
    /// Used for line blocks that only exist on one side of the comparison.
    #[inline]
    #[must_use]
    pub fn with_full_change(text: impl Into<String>) -> Self {
        Self {
            spans: smallvec::smallvec![Span::changed(text)],
        }
    }

    #[inline]
    pub fn push(&mut self, span: Span) {
        self.spans.push(span);
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.spans.iter().any(|s| s.changed)
    }

    /// Plain content, spans joined by a single space.
    #[must_use]
    pub fn text(&self) -> String {
        self.join(|span| span.text.clone())
    }

    /// Content with every changed span wrapped in `mark`'s marker. Text is inserted
    /// verbatim, so the result must be treated as markup by whoever displays it.
    #[must_use]
    pub fn marked(&self, mark: Mark) -> String {
        self.join(|span| {
            if span.changed {
                mark.wrap(&span.text)
            } else {
                span.text.clone()
            }
        })
    }

    pub(crate) fn join(&self, f: impl FnMut(&Span) -> String) -> String {
        self.spans.iter().map(f).collect::<Vec<_>>().join(" ")
    }
}

/// Raised when a segment breaks the alignment invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentError {
    /// A change segment with nothing on either side.
    #[error("malformed {} segment: both sides are empty", .kind.as_str())]
    Malformed { kind: Tag },
}

/// One block of the comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSegment {
    /// Opcode tag of the line block.
    pub kind: Tag,

    /// Content from the first document.
    pub original: Side,

    /// Content from the second document.
    pub modified: Side,
}

impl DiffSegment {
    /// Checks that a non-`Equal` segment carries content on at least one side.
    pub fn validate(&self) -> Result<(), SegmentError> {
        if self.kind != Tag::Equal && self.original.is_empty() && self.modified.is_empty() {
            return Err(SegmentError::Malformed { kind: self.kind });
        }
        Ok(())
    }

    /// Renders the segment in the marked-string wire format.
    #[must_use]
    pub fn to_marked(&self) -> MarkedSegment {
        MarkedSegment {
            kind: self.kind.as_str(),
            original: self.original.marked(Mark::Deleted),
            modified: self.modified.marked(Mark::Added),
        }
    }
}

/// Wire form of a [`DiffSegment`]: `{"type", "original", "modified"}` where the
/// sides carry `<span class="diff-del">`/`<span class="diff-add">` markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkedSegment {
    /// Lowercase tag name.
    #[serde(rename = "type")]
    pub kind: &'static str,

    /// Original side with changed spans in `diff-del` markers.
    pub original: String,

    /// Modified side with changed spans in `diff-add` markers.
    pub modified: String,
}

/// Lazy sequence of segments for two documents.
///
/// The line alignment is computed up front; word-level refinement of each
/// replaced block happens as the iterator reaches it.
pub struct Segments<'a> {
    a_lines: Vec<&'a str>,
    b_lines: Vec<&'a str>,
    ops: std::vec::IntoIter<Opcode>,
}

impl Segments<'_> {
    /// Number of segments not yet produced.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.ops.len()
    }
}

/// Aligns the lines of `text_a` and `text_b` and returns their segments.
#[must_use]
pub fn segments<'a>(text_a: &'a str, text_b: &'a str) -> Segments<'a> {
    let a_lines = split_lines(text_a);
    let b_lines = split_lines(text_b);
    let ops = Matcher::new(&a_lines, &b_lines).opcodes();

    log::debug!(
        "aligned {} old lines with {} new lines into {} opcodes",
        a_lines.len(),
        b_lines.len(),
        ops.len()
    );

    Segments {
        a_lines,
        b_lines,
        ops: ops.into_iter(),
    }
}

impl Iterator for Segments<'_> {
    type Item = DiffSegment;

    fn next(&mut self) -> Option<DiffSegment> {
        let op = self.ops.next()?;
        let segment = build_segment(op, &self.a_lines, &self.b_lines);
        debug_assert!(
            segment.validate().is_ok(),
            "{op:?} produced {segment:?}"
        );
        Some(segment)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ops.size_hint()
    }
}

impl ExactSizeIterator for Segments<'_> {}

/// Builds the segment for one line opcode.
fn build_segment(op: Opcode, a_lines: &[&str], b_lines: &[&str]) -> DiffSegment {
    let chunk_a = a_lines[op.i1..op.i2].join("\n");
    let chunk_b = b_lines[op.j1..op.j2].join("\n");

    let (original, modified) = match op.tag {
        Tag::Equal => (Side::unchanged(chunk_a), Side::unchanged(chunk_b)),
        Tag::Replace => refine_block(chunk_a, chunk_b),
        Tag::Delete => (Side::with_full_change(chunk_a), Side::empty()),
        Tag::Insert => (Side::empty(), Side::with_full_change(chunk_b)),
    };

    DiffSegment {
        kind: op.tag,
        original,
        modified,
    }
}

/// Refines a replaced line block word by word.
///
/// Blocks that differ only in whitespace have no words to compare; those are
/// marked whole on both sides instead.
fn refine_block(chunk_a: String, chunk_b: String) -> (Side, Side) {
    let (original, modified) = refine(&chunk_a, &chunk_b);
    if original.is_empty() && modified.is_empty() {
        return (
            Side::with_full_change(chunk_a),
            Side::with_full_change(chunk_b),
        );
    }
    (original, modified)
}
