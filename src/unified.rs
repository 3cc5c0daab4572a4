//! Unified-diff text for the technical view.
//!
//! Output follows the usual layout: a `---`/`+++` header, then one `@@` hunk per
//! group of nearby changes with three lines of context. Lines are joined with `\n`
//! and carry no trailing newline. Identical documents give an empty string.

use crate::align::{Matcher, Opcode, Tag};
use crate::segment::split_lines;
use std::fmt::Write as _;

/// Lines of unchanged context around each change.
pub const DEFAULT_CONTEXT: usize = 3;

/// Unified diff of two documents with empty file labels.
#[must_use]
pub fn unified_diff(text_a: &str, text_b: &str) -> String {
    unified_diff_with_labels(text_a, text_b, "", "", DEFAULT_CONTEXT)
}

/// Unified diff of two documents with the given `---`/`+++` labels and context size.
#[must_use]
pub fn unified_diff_with_labels(
    text_a: &str,
    text_b: &str,
    from_label: &str,
    to_label: &str,
    context: usize,
) -> String {
    let a_lines = split_lines(text_a);
    let b_lines = split_lines(text_b);
    let groups = Matcher::new(&a_lines, &b_lines).grouped_opcodes(context);
    if groups.is_empty() {
        return String::new();
    }

    let mut out: Vec<String> = Vec::with_capacity(2 + groups.len());
    out.push(format!("--- {from_label}"));
    out.push(format!("+++ {to_label}"));

    for group in &groups {
        out.push(hunk_header(group));
        for op in group {
            push_lines(&mut out, op, &a_lines, &b_lines);
        }
    }

    out.join("\n")
}

/// `@@ -start,len +start,len @@` for a group of opcodes.
fn hunk_header(group: &[Opcode]) -> String {
    let (first, last) = match (group.first(), group.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return String::new(),
    };
    let mut header = String::from("@@ -");
    header.push_str(&format_range(first.i1, last.i2));
    header.push_str(" +");
    header.push_str(&format_range(first.j1, last.j2));
    header.push_str(" @@");
    header
}

/// Formats a half-open line range as `start[,len]`, 1-based.
///
/// A single line omits the length; an empty range points at the line before it.
fn format_range(start: usize, stop: usize) -> String {
    let len = stop - start;
    let mut out = String::new();
    let _ = match len {
        1 => write!(out, "{}", start + 1),
        0 => write!(out, "{start},0"),
        _ => write!(out, "{},{len}", start + 1),
    };
    out
}

fn push_lines(out: &mut Vec<String>, op: &Opcode, a_lines: &[&str], b_lines: &[&str]) {
    if op.tag == Tag::Equal {
        out.extend(a_lines[op.i1..op.i2].iter().map(|line| format!(" {line}")));
        return;
    }
    if matches!(op.tag, Tag::Replace | Tag::Delete) {
        out.extend(a_lines[op.i1..op.i2].iter().map(|line| format!("-{line}")));
    }
    if matches!(op.tag, Tag::Replace | Tag::Insert) {
        out.extend(b_lines[op.j1..op.j2].iter().map(|line| format!("+{line}")));
    }
}
