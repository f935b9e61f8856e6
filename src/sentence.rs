//! Input sentence and byte-offset to line/column conversion
//!
//! The engine works exclusively in byte offsets; line/column positions only
//! matter at the edges (failure reporting, per-line token views). A
//! [`Sentence`] therefore pre-computes the byte offset of every line start
//! once and answers offset queries with a binary search, O(log n) per lookup.
//!
//! Positions are 1-based in both coordinates: parse failures are user-facing
//! and editors count from one.

use std::fmt;
use std::ops::Range;

use serde::Serialize;

/// A line/column position in the input text (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
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

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// The text being parsed, with a pre-computed line index.
#[derive(Debug, Clone)]
pub struct Sentence {
    text: String,
    /// Byte offsets where each line starts; `line_starts[0]` is always 0.
    line_starts: Vec<usize>,
}

impl Sentence {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        for (byte_pos, ch) in text.char_indices() {
            if ch == '\n' {
                line_starts.push(byte_pos + 1);
            }
        }
        Self { text, line_starts }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of the input in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// True once `position` is at or past the end of the text.
    pub fn is_end(&self, position: usize) -> bool {
        position >= self.text.len()
    }

    /// Convert a byte offset to a 1-based line/column position.
    ///
    /// Offsets past the end of the text resolve to one column past the last
    /// character, so failure positions at end-of-input stay addressable.
    pub fn location_of(&self, offset: usize) -> Position {
        let line = self
            .line_starts
            .binary_search(&offset)
            .unwrap_or_else(|i| i - 1);
        let column = offset - self.line_starts[line];
        Position::new(line + 1, column + 1)
    }

    /// Number of lines in the input; an empty input has one (empty) line.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte range covered by a 1-based line number, excluding the newline.
    pub fn line_range(&self, line: usize) -> Option<Range<usize>> {
        if line == 0 || line > self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[line - 1];
        let end = match self.line_starts.get(line) {
            Some(&next_start) => next_start - 1,
            None => self.text.len(),
        };
        Some(start..end)
    }

    /// The text slice covered by `range`.
    pub fn slice(&self, range: Range<usize>) -> &str {
        &self.text[range]
    }
}
