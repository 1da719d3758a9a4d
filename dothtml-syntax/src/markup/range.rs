//! Position tracking and offset conversion
//!
//!     Syntax tree nodes carry byte spans only. Line:column positions exist at
//!     the edges of the system (the editor protocol speaks in them), so the
//!     conversion lives in [`LineIndex`], a line-start table built lazily from
//!     the document text and rebuilt wholesale after every mutation.

use std::fmt;

/// A zero-based line:column position in source text. Columns count bytes
/// within the line, matching the byte spans stored on tree nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Pre-computed line starts for a fixed snapshot of text.
///
/// Conversion is O(log n) per lookup via binary search. The index is only
/// valid for the exact text it was built from; [`crate::Document`] discards it
/// on every edit rather than patching it.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    text_len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (idx, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(idx + 1);
            }
        }
        Self {
            line_starts,
            text_len: text.len(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Convert a byte offset to a position. Offsets past the end clamp to the
    /// end of text.
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.text_len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        Position::new(line, offset - self.line_starts[line])
    }

    /// Convert a position to a byte offset, clamping both coordinates to the
    /// text they index into.
    pub fn offset_at(&self, position: Position) -> usize {
        let line = position.line.min(self.line_starts.len() - 1);
        let line_start = self.line_starts[line];
        let line_end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.text_len);
        (line_start + position.column).min(line_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_positions_and_offsets() {
        let text = "first\nsecond line\n\nlast";
        let index = LineIndex::new(text);
        assert_eq!(index.line_count(), 4);

        for offset in 0..=text.len() {
            let position = index.position_at(offset);
            assert_eq!(index.offset_at(position), offset);
        }
    }

    #[test]
    fn clamps_out_of_range_lookups() {
        let index = LineIndex::new("ab\ncd");
        assert_eq!(index.position_at(100), Position::new(1, 2));
        assert_eq!(index.offset_at(Position::new(9, 9)), 5);
        // column past end of line clamps to the newline boundary
        assert_eq!(index.offset_at(Position::new(0, 50)), 3);
    }

    #[test]
    fn empty_text_has_one_line() {
        let index = LineIndex::new("");
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.position_at(0), Position::new(0, 0));
        assert_eq!(index.offset_at(Position::new(0, 0)), 0);
    }
}
