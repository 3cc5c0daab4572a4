//! Word-level refinement of changed text.
//!
//! Both inputs are split on runs of whitespace and aligned with the same
//! [`Matcher`](crate::align::Matcher) used for lines. Each opcode contributes at most
//! one span per side, holding its words joined by a single space:
//!
//! | tag     | original side   | modified side   |
//! |---------|-----------------|-----------------|
//! | equal   | unchanged span  | unchanged span  |
//! | replace | changed span    | changed span    |
//! | delete  | changed span    | -               |
//! | insert  | -               | changed span    |
//!
//! Original spacing is not kept: a side renders as its spans joined by one space.

use crate::align::{Matcher, Tag};
use crate::segment::{Side, Span};

/// Splits text into words on runs of Unicode whitespace or the ASCII
/// file/group/record/unit separators.
#[inline]
#[must_use]
pub fn split_words(text: &str) -> Vec<&str> {
    text.split(|c: char| c.is_whitespace() || ('\x1c'..='\x1f').contains(&c))
        .filter(|word| !word.is_empty())
        .collect()
}

/// Aligns the words of `text_a` and `text_b` and returns the highlighted
/// `(original, modified)` sides.
#[must_use]
pub fn refine(text_a: &str, text_b: &str) -> (Side, Side) {
    let a_words = split_words(text_a);
    let b_words = split_words(text_b);

    let mut original = Side::empty();
    let mut modified = Side::empty();

    for op in Matcher::new(&a_words, &b_words).opcodes() {
        let chunk_a = a_words[op.i1..op.i2].join(" ");
        let chunk_b = b_words[op.j1..op.j2].join(" ");

        match op.tag {
            Tag::Equal => {
                original.push(Span::unchanged(chunk_a));
                modified.push(Span::unchanged(chunk_b));
            }
            Tag::Replace => {
                original.push(Span::changed(chunk_a));
                modified.push(Span::changed(chunk_b));
            }
            Tag::Delete => original.push(Span::changed(chunk_a)),
            Tag::Insert => modified.push(Span::changed(chunk_b)),
        }
    }

    (original, modified)
}
