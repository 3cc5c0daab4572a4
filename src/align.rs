//! Sequence alignment by longest matching blocks.
//!
//! [`Matcher`] compares two slices of tokens and produces the [`Opcode`]s that turn
//! the first slice into the second. The same matcher is used for whole lines and for
//! the words inside a changed line, so it is generic over the token type.
//!
//! ## Algorithm
//!
//! 1. Find the longest contiguous block that appears in both sequences
//! 2. Recurse on the unmatched region before the block and the one after it
//! 3. Sort the blocks, merge the ones that touch, and close with a zero-size sentinel
//! 4. Walk the blocks and emit an opcode for every gap and every block
//!
//! When several blocks share the maximal length, the one starting earliest in the
//! first sequence wins, then the one starting earliest in the second. Every token
//! takes part in matching; nothing is treated as junk.

use std::collections::HashMap;
use std::hash::Hash;

/// How a range of the first sequence maps onto a range of the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    /// Both ranges hold the same tokens.
    Equal,
    /// Tokens only in the second sequence; the first range is empty.
    Insert,
    /// Tokens only in the first sequence; the second range is empty.
    Delete,
    /// Both ranges are non-empty and differ.
    Replace,
}

impl Tag {
    /// Parses the lowercase wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "equal" => Some(Self::Equal),
            "insert" => Some(Self::Insert),
            "delete" => Some(Self::Delete),
            "replace" => Some(Self::Replace),
            _ => None,
        }
    }

    /// Lowercase name, as used on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::Insert => "insert",
            Self::Delete => "delete",
            Self::Replace => "replace",
        }
    }
}

/// A tagged pair of half-open ranges: `a[i1..i2]` becomes `b[j1..j2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub tag: Tag,

    /// Start of the range in the first sequence.
    pub i1: usize,

    /// End (exclusive) of the range in the first sequence.
    pub i2: usize,

    /// Start of the range in the second sequence.
    pub j1: usize,

    /// End (exclusive) of the range in the second sequence.
    pub j2: usize,
}

impl Opcode {
    #[inline]
    #[must_use]
    pub fn new(tag: Tag, i1: usize, i2: usize, j1: usize, j2: usize) -> Self {
        Self { tag, i1, i2, j1, j2 }
    }
}

/// A block of `size` equal tokens starting at `a` in the first sequence and `b` in
/// the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Start in the first sequence.
    pub a: usize,

    /// Start in the second sequence.
    pub b: usize,

    /// Number of equal tokens; zero only for the closing sentinel.
    pub size: usize,
}

/// Aligns two token sequences.
pub struct Matcher<'a, T> {
    a: &'a [T],
    b: &'a [T],
    /// Positions of every token of `b`, in increasing order.
    b2j: HashMap<&'a T, Vec<usize>>,
}

impl<'a, T: Eq + Hash> Matcher<'a, T> {
    #[must_use]
    pub fn new(a: &'a [T], b: &'a [T]) -> Self {
        let mut b2j: HashMap<&'a T, Vec<usize>> = HashMap::with_capacity(b.len());
        for (j, token) in b.iter().enumerate() {
            b2j.entry(token).or_default().push(j);
        }
        Self { a, b, b2j }
    }

    /// Finds the longest block with `a[alo..ahi]` and `b[blo..bhi]` in common.
    ///
    /// Of all maximal blocks, returns the one with the smallest start in `a`, and of
    /// those the one with the smallest start in `b`. Returns a zero-size match at
    /// `(alo, blo)` when the ranges share nothing.
    #[must_use]
    pub fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Match {
        let mut best = Match {
            a: alo,
            b: blo,
            size: 0,
        };
        // j2len[j] = length of the match ending at a[i - 1] and b[j]
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next.insert(j, k);
                    // Strictly greater keeps the leftmost block on ties
                    if k > best.size {
                        best = Match {
                            a: i + 1 - k,
                            b: j + 1 - k,
                            size: k,
                        };
                    }
                }
            }
            j2len = next;
        }

        best
    }

    /// Returns the non-overlapping matching blocks in increasing order, adjacent
    /// blocks merged, followed by the sentinel `Match { a: len(a), b: len(b), size: 0 }`.
    #[must_use]
    pub fn matching_blocks(&self) -> Vec<Match> {
        let (la, lb) = (self.a.len(), self.b.len());
        let mut queue = vec![(0, la, 0, lb)];
        let mut blocks = Vec::new();

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let m = self.find_longest_match(alo, ahi, blo, bhi);
            if m.size == 0 {
                continue;
            }
            blocks.push(m);
            if alo < m.a && blo < m.b {
                queue.push((alo, m.a, blo, m.b));
            }
            if m.a + m.size < ahi && m.b + m.size < bhi {
                queue.push((m.a + m.size, ahi, m.b + m.size, bhi));
            }
        }

        blocks.sort_unstable_by_key(|m| (m.a, m.b));

        let mut merged: Vec<Match> = Vec::with_capacity(blocks.len() + 1);
        for m in blocks {
            if let Some(last) = merged.last_mut() {
                if last.a + last.size == m.a && last.b + last.size == m.b {
                    last.size += m.size;
                    continue;
                }
            }
            merged.push(m);
        }
        merged.push(Match {
            a: la,
            b: lb,
            size: 0,
        });

        merged
    }

    /// Returns the opcodes that transform `a` into `b`.
    ///
    /// The opcodes cover both sequences contiguously and in order. Two equal
    /// sequences give a single `Equal`; two empty sequences give nothing.
    #[must_use]
    pub fn opcodes(&self) -> Vec<Opcode> {
        let mut ops = Vec::new();
        let (mut i, mut j) = (0, 0);

        for m in self.matching_blocks() {
            let tag = match (i < m.a, j < m.b) {
                (true, true) => Some(Tag::Replace),
                (true, false) => Some(Tag::Delete),
                (false, true) => Some(Tag::Insert),
                (false, false) => None,
            };
            if let Some(tag) = tag {
                ops.push(Opcode::new(tag, i, m.a, j, m.b));
            }
            i = m.a + m.size;
            j = m.b + m.size;
            if m.size > 0 {
                ops.push(Opcode::new(Tag::Equal, m.a, i, m.b, j));
            }
        }

        ops
    }

    /// Groups the opcodes into hunks with up to `context` tokens of equal context on
    /// each side. Long equal runs are cut; groups made only of context are dropped.
    #[must_use]
    pub fn grouped_opcodes(&self, context: usize) -> Vec<Vec<Opcode>> {
        let mut codes = self.opcodes();
        if codes.is_empty() {
            codes.push(Opcode::new(Tag::Equal, 0, 1, 0, 1));
        }

        if let Some(first) = codes.first_mut() {
            if first.tag == Tag::Equal {
                first.i1 = first.i1.max(first.i2.saturating_sub(context));
                first.j1 = first.j1.max(first.j2.saturating_sub(context));
            }
        }
        if let Some(last) = codes.last_mut() {
            if last.tag == Tag::Equal {
                last.i2 = last.i2.min(last.i1.saturating_add(context));
                last.j2 = last.j2.min(last.j1.saturating_add(context));
            }
        }

        let mut groups = Vec::new();
        let mut group = Vec::new();
        for mut op in codes {
            if op.tag == Tag::Equal && op.i2 - op.i1 > context.saturating_mul(2) {
                group.push(Opcode::new(
                    Tag::Equal,
                    op.i1,
                    op.i2.min(op.i1.saturating_add(context)),
                    op.j1,
                    op.j2.min(op.j1.saturating_add(context)),
                ));
                groups.push(std::mem::take(&mut group));
                op.i1 = op.i1.max(op.i2.saturating_sub(context));
                op.j1 = op.j1.max(op.j2.saturating_sub(context));
            }
            group.push(op);
        }

        let only_context = group.len() == 1 && group[0].tag == Tag::Equal;
        if !group.is_empty() && !only_context {
            groups.push(group);
        }

        groups
    }
}

/// Convenience wrapper for `Matcher::new(a, b).opcodes()`.
#[must_use]
pub fn opcodes<T: Eq + Hash>(a: &[T], b: &[T]) -> Vec<Opcode> {
    Matcher::new(a, b).opcodes()
}
