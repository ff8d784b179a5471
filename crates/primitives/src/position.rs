//! Conversions between absolute character offsets and (line, column) pairs.
//!
//! The line index is whatever `ropey` computes for the text snapshot passed
//! in; nothing here keeps state between calls.

use ropey::RopeSlice;
use thiserror::Error;

use crate::range::{CharIdx, CharLen};

/// A zero-based (line, column) coordinate, columns counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LineCol {
	pub line: usize,
	pub col: usize,
}

impl LineCol {
	pub const fn new(line: usize, col: usize) -> Self {
		Self { line, col }
	}
}

/// Errors produced when a coordinate does not exist in a text snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PositionError {
	#[error("char offset {pos} is past the end of the text ({len} chars)")]
	CharOutOfBounds { pos: CharIdx, len: CharLen },
	#[error("line {line} does not exist (text has {lines} lines)")]
	LineOutOfBounds { line: usize, lines: usize },
	#[error("column {col} is past the end of line {line} ({len} chars)")]
	ColumnOutOfBounds { line: usize, col: usize, len: CharLen },
	#[error("range start {start} is after its end {end}")]
	InvertedRange { start: CharIdx, end: CharIdx },
}

/// Converts an absolute char offset to a (line, column) pair.
///
/// `pos == len_chars()` is valid and addresses the end of the last line.
pub fn char_to_line_col(text: RopeSlice<'_>, pos: CharIdx) -> Result<LineCol, PositionError> {
	let len = text.len_chars();
	if pos > len {
		return Err(PositionError::CharOutOfBounds { pos, len });
	}
	let line = text.char_to_line(pos);
	Ok(LineCol {
		line,
		col: pos - text.line_to_char(line),
	})
}

/// Converts a (line, column) pair back to an absolute char offset.
pub fn line_col_to_char(text: RopeSlice<'_>, at: LineCol) -> Result<CharIdx, PositionError> {
	let start = line_start(text, at.line)?;
	let len = text.line(at.line).len_chars();
	if at.col > len {
		return Err(PositionError::ColumnOutOfBounds {
			line: at.line,
			col: at.col,
			len,
		});
	}
	Ok(start + at.col)
}

/// Returns the absolute offset of the first character of `line`.
pub fn line_start(text: RopeSlice<'_>, line: usize) -> Result<CharIdx, PositionError> {
	let lines = text.len_lines();
	if line >= lines {
		return Err(PositionError::LineOutOfBounds { line, lines });
	}
	Ok(text.line_to_char(line))
}

/// Returns the length of `line` in characters, excluding its line break.
pub fn line_len(text: RopeSlice<'_>, line: usize) -> Result<CharLen, PositionError> {
	let lines = text.len_lines();
	if line >= lines {
		return Err(PositionError::LineOutOfBounds { line, lines });
	}
	let slice = text.line(line);
	let mut len = slice.len_chars();
	// "\r\n" counts as a single break in ropey's line index
	if len > 0 && slice.char(len - 1) == '\n' {
		len -= 1;
		if len > 0 && slice.char(len - 1) == '\r' {
			len -= 1;
		}
	} else if len > 0
		&& matches!(
			slice.char(len - 1),
			'\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
		) {
		len -= 1;
	}
	Ok(len)
}

#[cfg(test)]
mod tests;
