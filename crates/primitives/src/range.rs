//! Half-open character ranges in absolute and line/column form.

use std::ops;

use ropey::RopeSlice;

use crate::position::{LineCol, PositionError, char_to_line_col, line_col_to_char};

/// An absolute position in a document, measured in characters (not bytes).
pub type CharIdx = usize;

/// A length or count in the text, measured in characters (not bytes).
///
/// This is distinct from CharIdx to avoid accidentally passing an index
/// where a length is expected or vice versa.
pub type CharLen = usize;

/// A half-open range of absolute character offsets in one coordinate space.
///
/// A character at offset `o` is covered iff `start <= o < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
	/// First covered offset.
	pub start: CharIdx,
	/// One past the last covered offset.
	pub end: CharIdx,
}

impl Span {
	/// Creates a span, rejecting `start > end`.
	pub fn new(start: CharIdx, end: CharIdx) -> Result<Self, PositionError> {
		if start > end {
			return Err(PositionError::InvertedRange { start, end });
		}
		Ok(Self { start, end })
	}

	#[inline]
	pub fn len(&self) -> CharLen {
		self.end.saturating_sub(self.start)
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.end <= self.start
	}

	/// Returns true if the offset is covered by this span.
	#[inline]
	pub fn contains(&self, pos: CharIdx) -> bool {
		self.start <= pos && pos < self.end
	}

	/// Returns true if the two spans share at least one covered offset.
	#[inline]
	pub fn intersects(&self, other: &Span) -> bool {
		self.start < other.end && other.start < self.end
	}

	/// Clips this span to `bounds`, returning `None` when nothing remains.
	pub fn clip(&self, bounds: &Span) -> Option<Span> {
		let start = self.start.max(bounds.start);
		let end = self.end.min(bounds.end);
		(start < end).then_some(Span { start, end })
	}

	/// Converts this span to line/column form against `text`.
	pub fn to_text_span(&self, text: RopeSlice<'_>) -> Result<TextSpan, PositionError> {
		Ok(TextSpan {
			start: char_to_line_col(text, self.start)?,
			end: char_to_line_col(text, self.end)?,
		})
	}
}

impl From<Span> for ops::Range<CharIdx> {
	fn from(span: Span) -> Self {
		span.start..span.end
	}
}

/// A half-open range expressed as (line, column) endpoints.
///
/// This is the form the host uses to address text inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextSpan {
	pub start: LineCol,
	pub end: LineCol,
}

impl TextSpan {
	pub const fn new(start: LineCol, end: LineCol) -> Self {
		Self { start, end }
	}

	/// Returns true if the span's line interval includes `line`.
	#[inline]
	pub fn touches_line(&self, line: usize) -> bool {
		self.start.line <= line && line <= self.end.line
	}

	/// Returns the covered column interval of `line`, given that line's length.
	///
	/// Lines strictly inside a multi-line span are covered in full; the first
	/// and last lines are cut at the span's start and end columns. The result
	/// never exceeds `line_len`.
	pub fn columns_on_line(&self, line: usize, line_len: CharLen) -> Option<ops::Range<usize>> {
		if !self.touches_line(line) {
			return None;
		}
		let first = if self.start.line == line {
			self.start.col
		} else {
			0
		};
		let last = if self.end.line == line {
			self.end.col
		} else {
			line_len
		};
		let last = last.min(line_len);
		(first < last).then_some(first..last)
	}

	/// Converts back to absolute offsets against `text`.
	pub fn to_span(&self, text: RopeSlice<'_>) -> Result<Span, PositionError> {
		Span::new(
			line_col_to_char(text, self.start)?,
			line_col_to_char(text, self.end)?,
		)
	}
}
