//! This module provides the [`Span`], [`WithSpan`], and [`LineOffsets`] types.

use std::{cmp, hash::Hash, ops::Deref};

/// A region of source code, measured in byte indices.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Span {
    /// The index of the first byte of the span.
    pub start: usize,

    /// The index of the last byte of the span (inclusive).
    pub end: usize,
}

impl Span {
    /// The smallest span covering both `self` and `other`.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            start: cmp::min(self.start, other.start),
            end: cmp::max(self.end, other.end),
        }
    }

    /// Grow this span in-place to also cover `other`.
    pub fn mut_union(&mut self, other: &Self) {
        *self = self.union(other);
    }
}

/// A value tagged with the [`Span`] it came from.
#[derive(Clone, Copy, Debug)]
pub struct WithSpan<T> {
    /// The span of the value.
    pub span: Span,

    /// The value itself.
    pub value: T,
}

impl<T> WithSpan<T> {
    /// Wrap a value with a span.
    pub fn new(span: Span, value: T) -> Self {
        Self { span, value }
    }
}

impl<T: PartialEq> PartialEq for WithSpan<T> {
    fn eq(&self, other: &Self) -> bool {
        self.span == other.span && self.value == other.value
    }
}

impl<T: Eq> Eq for WithSpan<T> {}

impl<T: Hash> Hash for WithSpan<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.span.hash(state);
        self.value.hash(state);
    }
}

impl<T> Deref for WithSpan<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

/// A table of newline positions, used to turn [`Span`]s into 1-based line numbers.
#[derive(Clone, Debug)]
pub struct LineOffsets {
    /// The byte index of the start of each line.
    line_starts: Vec<usize>,

    /// The total length of the source in bytes.
    len: usize,
}

impl LineOffsets {
    /// Build the newline table for the given source.
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (idx, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(idx + 1);
            }
        }

        Self {
            line_starts,
            len: source.len(),
        }
    }

    /// Get the 1-based line number containing the given byte offset.
    ///
    /// Offsets past the end of the source (stale spans from an earlier REPL
    /// line, or spans pointing at EOF) clamp to the last line.
    pub fn line(&self, offset: usize) -> usize {
        let offset = cmp::min(offset, self.len);
        match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_numbers() {
        let offsets = LineOffsets::new("one\ntwo\n\nfour");

        assert_eq!(offsets.line(0), 1);
        assert_eq!(offsets.line(3), 1);
        assert_eq!(offsets.line(4), 2);
        assert_eq!(offsets.line(7), 2);
        assert_eq!(offsets.line(8), 3);
        assert_eq!(offsets.line(9), 4);
        assert_eq!(offsets.line(12), 4);

        // Past-the-end offsets clamp to the last line.
        assert_eq!(offsets.line(10_000), 4);
    }

    #[test]
    fn span_union() {
        let a = Span { start: 3, end: 7 };
        let b = Span { start: 5, end: 12 };

        assert_eq!(a.union(&b), Span { start: 3, end: 12 });
        assert_eq!(b.union(&a), Span { start: 3, end: 12 });

        let mut c = a;
        c.mut_union(&b);
        assert_eq!(c, Span { start: 3, end: 12 });
    }
}
