//! Whole-document comparison.
//!
//! [`compare`] produces everything a caller displays for one pair of documents:
//! the unified diff, the segments for the table view, and a summary. Each call is a
//! pure function of its inputs plus the injected summarizer, so batches run in
//! parallel with [`compare_many`].

use crate::segment::{DiffSegment, MarkedSegment, segments};
use crate::summary::{NO_DIFFERENCES, Summarizer, summarize_or_fallback};
use crate::unified::unified_diff;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

/// Which input of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Which {
    /// The first document.
    Original,
    /// The second document.
    Modified,
    /// Both documents.
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompareError {
    /// Comparing against an empty document is refused before any work is done.
    #[error("{}", empty_message(.0))]
    EmptyInput(Which),
}

fn empty_message(which: &Which) -> &'static str {
    match which {
        Which::Original => "the original document is empty",
        Which::Modified => "the modified document is empty",
        Which::Both => "both documents are empty",
    }
}

/// Rejects empty documents. Hosts call this before [`compare`]; the comparison
/// itself accepts empty input.
pub fn validate_inputs(text_a: &str, text_b: &str) -> Result<(), CompareError> {
    match (text_a.is_empty(), text_b.is_empty()) {
        (true, true) => Err(CompareError::EmptyInput(Which::Both)),
        (true, false) => Err(CompareError::EmptyInput(Which::Original)),
        (false, true) => Err(CompareError::EmptyInput(Which::Modified)),
        (false, false) => Ok(()),
    }
}

/// Result of comparing two documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    /// Unified-diff text, empty when the documents have the same lines.
    pub diff: String,

    /// Table rows in document order.
    pub segments: Vec<DiffSegment>,

    /// Prose synopsis of `diff`.
    pub summary: String,
}

impl Comparison {
    /// True when both documents have the same lines, so the diff is empty. The
    /// segments then hold at most one `Equal` block.
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.diff.is_empty()
    }

    /// Segments in the marked-string wire format.
    #[must_use]
    pub fn json_diff(&self) -> Vec<MarkedSegment> {
        self.segments.iter().map(DiffSegment::to_marked).collect()
    }
}

impl Serialize for Comparison {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            diff: &'a str,
            json_diff: Vec<MarkedSegment>,
            summary: &'a str,
        }

        Wire {
            diff: &self.diff,
            json_diff: self.json_diff(),
            summary: &self.summary,
        }
        .serialize(serializer)
    }
}

/// Compares two documents.
///
/// Without a summarizer, `summary` is [`NO_DIFFERENCES`] for identical documents
/// and empty otherwise.
#[must_use]
pub fn compare(text_a: &str, text_b: &str, summarizer: Option<&dyn Summarizer>) -> Comparison {
    let diff = unified_diff(text_a, text_b);
    let segments: Vec<DiffSegment> = segments(text_a, text_b).collect();

    let summary = match summarizer {
        Some(summarizer) => summarize_or_fallback(summarizer, &diff),
        None if diff.trim().is_empty() => NO_DIFFERENCES.to_string(),
        None => String::new(),
    };

    log::debug!(
        "Compared documents ({} + {} bytes): {} segments, {} diff bytes",
        text_a.len(),
        text_b.len(),
        segments.len(),
        diff.len()
    );

    Comparison {
        diff,
        segments,
        summary,
    }
}

/// Compares many independent pairs in parallel, preserving input order.
#[must_use]
pub fn compare_many<A, B>(pairs: &[(A, B)], summarizer: Option<&dyn Summarizer>) -> Vec<Comparison>
where
    A: AsRef<str> + Sync,
    B: AsRef<str> + Sync,
{
    pairs
        .par_iter()
        .map(|(a, b)| compare(a.as_ref(), b.as_ref(), summarizer))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::Tag;
    use crate::summary::tests::FakeSummarizer;
    use pretty_assertions::assert_eq;

    #[test]
    fn identical_documents() {
        let result = compare("hello world", "hello world", None);
        assert_eq!(result.diff, "");
        assert!(result.is_identical());
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].kind, Tag::Equal);
        assert_eq!(result.summary, NO_DIFFERENCES);
    }

    #[test]
    fn empty_documents_skip_summarizer() {
        let fake = FakeSummarizer::replying("should not appear");
        let result = compare("", "", Some(&fake));
        assert!(result.segments.is_empty());
        assert_eq!(result.diff, "");
        assert_eq!(result.summary, NO_DIFFERENCES);
        assert_eq!(fake.calls(), 0);
    }

    #[test]
    fn summarizer_sees_changes() {
        let fake = FakeSummarizer::replying("**Key Changes:**\n* cat became dog");
        let result = compare("The cat sat", "The dog sat", Some(&fake));
        assert_eq!(result.summary, "**Key Changes:**\n* cat became dog");
        assert_eq!(fake.calls(), 1);
    }

    #[test]
    fn summarizer_failure_does_not_fail_comparison() {
        let fake = FakeSummarizer::failing();
        let result = compare("a", "b", Some(&fake));
        assert!(result.summary.starts_with("Summary error: "));
        assert_eq!(result.segments.len(), 1);
        assert!(!result.diff.is_empty());
    }

    #[test]
    fn no_summarizer_leaves_summary_empty_for_changes() {
        let result = compare("a", "b", None);
        assert_eq!(result.summary, "");
    }

    #[test]
    fn serializes_to_wire_format() {
        let result = compare("line1\nline2", "line1\nline2\nline3", None);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "diff": "--- \n+++ \n@@ -1,2 +1,3 @@\n line1\n line2\n+line3",
                "json_diff": [
                    {"type": "equal", "original": "line1\nline2", "modified": "line1\nline2"},
                    {"type": "insert", "original": "", "modified": "<span class=\"diff-add\">line3</span>"},
                ],
                "summary": "",
            })
        );
    }

    #[test]
    fn empty_inputs_are_rejected_by_validation() {
        assert_eq!(validate_inputs("a", "b"), Ok(()));
        assert_eq!(
            validate_inputs("", "b"),
            Err(CompareError::EmptyInput(Which::Original))
        );
        assert_eq!(
            validate_inputs("a", ""),
            Err(CompareError::EmptyInput(Which::Modified))
        );
        assert_eq!(
            validate_inputs("", "").unwrap_err().to_string(),
            "both documents are empty"
        );
    }

    #[test]
    fn batch_preserves_order() {
        let pairs = vec![
            ("same", "same"),
            ("a b c", "a c b"),
            ("", "new"),
            ("gone", ""),
        ];
        let results = compare_many(&pairs, None);
        let kinds: Vec<Vec<Tag>> = results
            .iter()
            .map(|r| r.segments.iter().map(|s| s.kind).collect())
            .collect();
        assert_eq!(
            kinds,
            vec![
                vec![Tag::Equal],
                vec![Tag::Replace],
                vec![Tag::Insert],
                vec![Tag::Delete],
            ]
        );
        assert_eq!(results[1], compare("a b c", "a c b", None));
    }

    #[test]
    fn batch_shares_one_summarizer() {
        let fake = FakeSummarizer::replying("changed");
        let pairs = vec![("x".to_string(), "y".to_string()); 8];
        let results = compare_many(&pairs, Some(&fake));
        assert!(results.iter().all(|r| r.summary == "changed"));
        assert_eq!(fake.calls(), 8);
    }
}
