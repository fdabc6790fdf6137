//! Offset <-> line/column translation
//!
//! Offsets are byte offsets into the UTF-8 source text. Lines are separated by
//! any of a configurable set of line-ending sequences; a multi-character
//! sequence such as `\r\n` counts as a single break.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use thiserror::Error;

/// Error raised for position queries outside the source text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("Index out of range (requested index {index}, but source text has length {length}).")]
    IndexOutOfRange { index: usize, length: usize },

    #[error(
        "Line number out of range (line {line} requested). Line numbers should be {line_start}-based and column numbers {column_start}-based."
    )]
    BelowStart {
        line: usize,
        line_start: usize,
        column_start: usize,
    },

    #[error("Line number out of range (line {line} requested, but only {lines} lines present).")]
    LineOutOfRange { line: usize, lines: usize },

    #[error("Column number out of range (column {column} requested, but the length of line {line} is {length}).")]
    ColumnOutOfRange {
        column: usize,
        line: usize,
        length: usize,
    },
}

/// A point in the source text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Position {
    /// The `(line, column)` pair, for ordering against other positions
    pub fn line_column(&self) -> LineColumn {
        LineColumn {
            line: self.line,
            column: self.column,
        }
    }
}

/// Start and end of a node or comment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub start: Position,
    pub end: Position,
}

impl SourceLocation {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Whether the location starts and ends on different lines
    pub fn spans_lines(&self) -> bool {
        self.start.line != self.end.line
    }
}

/// A line/column pair without an offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

impl LineColumn {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// The set of sequences recognized as line breaks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineEndings {
    /// Sorted longest first so `\r\n` wins over `\r`
    sequences: Vec<String>,
}

impl Default for LineEndings {
    fn default() -> Self {
        Self::new(["\r\n", "\r", "\n", "\u{2028}", "\u{2029}"])
    }
}

impl LineEndings {
    /// Create a line-ending set from the given sequences (empty ones are ignored)
    pub fn new<I, S>(sequences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sequences: Vec<String> = sequences
            .into_iter()
            .map(Into::into)
            .filter(|s| !s.is_empty())
            .collect();
        sequences.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        sequences.dedup();
        Self { sequences }
    }

    /// Length of the line ending starting at byte `at`, if any
    pub fn match_at(&self, text: &str, at: usize) -> Option<usize> {
        let rest = text.as_bytes().get(at..)?;
        self.sequences
            .iter()
            .find(|seq| rest.starts_with(seq.as_bytes()))
            .map(String::len)
    }

    /// Byte offsets at which each line begins (always starts with 0)
    pub fn line_starts(&self, text: &str) -> Vec<usize> {
        let mut starts = vec![0];
        let mut at = 0;
        while at < text.len() {
            match self.match_at(text, at) {
                Some(len) => {
                    at += len;
                    starts.push(at);
                }
                None => at += 1,
            }
        }
        starts
    }

    /// Byte ranges of each line, excluding the terminators
    pub fn line_ranges(&self, text: &str) -> Vec<Range<usize>> {
        let starts = self.line_starts(text);
        starts
            .iter()
            .enumerate()
            .map(|(i, &start)| match starts.get(i + 1) {
                Some(&next) => start..self.content_end(text, start, next),
                None => start..text.len(),
            })
            .collect()
    }

    /// Split text into lines, dropping the terminators
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.line_ranges(text)
            .into_iter()
            .map(|range| text.get(range).unwrap_or(""))
            .collect()
    }

    /// End of a line's content, given where the next line starts
    fn content_end(&self, text: &str, start: usize, next: usize) -> usize {
        (start..next)
            .find(|&at| self.match_at(text, at) == Some(next - at))
            .unwrap_or(next)
    }
}

/// Bidirectional offset/line-column index over one text
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    length: usize,
    line_start: usize,
    column_start: usize,
}

impl LineIndex {
    /// Build an index with 1-based lines and columns
    pub fn new(text: &str, endings: &LineEndings) -> Self {
        Self::with_bases(text, endings, 1, 1)
    }

    /// Build an index with custom first line and first column numbers
    pub fn with_bases(
        text: &str,
        endings: &LineEndings,
        line_start: usize,
        column_start: usize,
    ) -> Self {
        Self {
            line_starts: endings.line_starts(text),
            length: text.len(),
            line_start,
            column_start,
        }
    }

    /// Number of lines (an empty text has one line)
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Number of the first line
    pub fn line_start(&self) -> usize {
        self.line_start
    }

    /// Number of the first column
    pub fn column_start(&self) -> usize {
        self.column_start
    }

    /// Translate a byte offset into a line/column pair
    pub fn loc_from_index(&self, index: usize) -> Result<LineColumn, PositionError> {
        if index > self.length {
            return Err(PositionError::IndexOutOfRange {
                index,
                length: self.length,
            });
        }
        let line_idx = self.line_starts.partition_point(|&start| start <= index) - 1;
        Ok(LineColumn {
            line: line_idx + self.line_start,
            column: index - self.line_starts[line_idx] + self.column_start,
        })
    }

    /// Translate a line/column pair back into a byte offset
    pub fn index_from_loc(&self, loc: LineColumn) -> Result<usize, PositionError> {
        let LineColumn { line, column } = loc;
        if line < self.line_start || column < self.column_start {
            return Err(PositionError::BelowStart {
                line,
                line_start: self.line_start,
                column_start: self.column_start,
            });
        }

        let line_idx = line - self.line_start;
        let Some(&begin) = self.line_starts.get(line_idx) else {
            return Err(PositionError::LineOutOfRange {
                line,
                lines: self.line_count(),
            });
        };

        let is_last = line_idx + 1 == self.line_starts.len();
        let end = if is_last {
            self.length
        } else {
            self.line_starts[line_idx + 1]
        };

        let out_of_range = PositionError::ColumnOutOfRange {
            column,
            line,
            length: end - begin,
        };
        let Some(index) = begin.checked_add(column - self.column_start) else {
            return Err(out_of_range);
        };
        if (is_last && index > end) || (!is_last && index >= end) {
            return Err(out_of_range);
        }
        Ok(index)
    }

    /// Full position for an offset, clamping offsets past the end
    pub fn position(&self, index: usize) -> Position {
        let index = index.min(self.length);
        let line_idx = self.line_starts.partition_point(|&start| start <= index) - 1;
        Position {
            line: line_idx + self.line_start,
            column: index - self.line_starts[line_idx] + self.column_start,
            offset: index,
        }
    }
}
