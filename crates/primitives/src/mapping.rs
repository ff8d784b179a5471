//! Correspondence entries relating primary ranges to secondary ranges.
//!
//! A generation pass emits entries as absolute offset pairs
//! ([`RawCorrespondence`]). Before installation they are converted to
//! line/column form ([`SpanMapping`]) against the primary and secondary text
//! current at that moment, and the whole batch becomes one [`MappingTable`].

use ropey::RopeSlice;

use crate::position::{LineCol, PositionError, line_col_to_char};
use crate::range::{CharIdx, Span, TextSpan};

/// A correspondence entry in the absolute-offset form a generator emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RawCorrespondence {
	pub start1: CharIdx,
	pub end1: CharIdx,
	pub start2: CharIdx,
	pub end2: CharIdx,
}

impl RawCorrespondence {
	pub const fn new(start1: CharIdx, end1: CharIdx, start2: CharIdx, end2: CharIdx) -> Self {
		Self {
			start1,
			end1,
			start2,
			end2,
		}
	}

	/// Returns true if both ranges are well-ordered and inside the given lengths.
	pub fn is_within(&self, primary_len: usize, secondary_len: usize) -> bool {
		self.start1 <= self.end1
			&& self.end1 <= primary_len
			&& self.start2 <= self.end2
			&& self.end2 <= secondary_len
	}
}

/// One installed correspondence, addressed by line and column on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpanMapping {
	pub primary: TextSpan,
	pub secondary: TextSpan,
}

impl SpanMapping {
	/// Converts a raw entry against the given primary and secondary text.
	///
	/// Offsets past the end of either text are clipped to its length and an
	/// inverted range collapses to its start, so a malformed entry still
	/// yields a usable (possibly empty) mapping.
	pub fn from_raw(raw: &RawCorrespondence, primary: RopeSlice<'_>, secondary: RopeSlice<'_>) -> Self {
		Self {
			primary: clipped_text_span(primary, raw.start1, raw.end1),
			secondary: clipped_text_span(secondary, raw.start2, raw.end2),
		}
	}

	/// Converts back to absolute offsets.
	pub fn to_raw(
		&self,
		primary: RopeSlice<'_>,
		secondary: RopeSlice<'_>,
	) -> Result<RawCorrespondence, PositionError> {
		let p = self.primary.to_span(primary)?;
		let s = self.secondary.to_span(secondary)?;
		Ok(RawCorrespondence::new(p.start, p.end, s.start, s.end))
	}

	/// Returns true if `pos` lies inside the primary range.
	pub fn primary_contains(&self, pos: LineCol) -> bool {
		self.primary.start <= pos && pos < self.primary.end
	}

	/// Returns true if `pos` lies inside the secondary range.
	pub fn secondary_contains(&self, pos: LineCol) -> bool {
		self.secondary.start <= pos && pos < self.secondary.end
	}
}

fn clipped_text_span(text: RopeSlice<'_>, start: CharIdx, end: CharIdx) -> TextSpan {
	let len = text.len_chars();
	let end = end.min(len);
	let start = start.min(end);
	let at = |pos: CharIdx| {
		let line = text.char_to_line(pos);
		LineCol::new(line, pos - text.line_to_char(line))
	};
	TextSpan::new(at(start), at(end))
}

/// An ordered, immutable batch of [`SpanMapping`]s from one generation pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MappingTable {
	entries: Vec<SpanMapping>,
}

impl MappingTable {
	pub fn new(entries: Vec<SpanMapping>) -> Self {
		Self { entries }
	}

	/// Builds a table from raw entries, converting each against `primary` and `secondary`.
	pub fn from_raw(raw: &[RawCorrespondence], primary: RopeSlice<'_>, secondary: RopeSlice<'_>) -> Self {
		Self {
			entries: raw
				.iter()
				.map(|r| SpanMapping::from_raw(r, primary, secondary))
				.collect(),
		}
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn entries(&self) -> &[SpanMapping] {
		&self.entries
	}

	/// Entries whose primary line interval includes `line`, in batch order.
	pub fn overlapping_line(&self, line: usize) -> impl Iterator<Item = &SpanMapping> + '_ {
		self.entries
			.iter()
			.filter(move |m| m.primary.touches_line(line))
	}

	/// First entry whose primary range contains `pos`.
	pub fn find_primary(&self, pos: LineCol) -> Option<&SpanMapping> {
		self.entries.iter().find(|m| m.primary_contains(pos))
	}

	/// First entry whose secondary range contains `pos`.
	pub fn find_secondary(&self, pos: LineCol) -> Option<&SpanMapping> {
		self.entries.iter().find(|m| m.secondary_contains(pos))
	}
}

/// Translates `pos` from the `from` range of an entry into the `to` range.
///
/// The offset from the start of `from` is carried over to `to` and clamped
/// to its end, so ranges of unequal length still map inside the target.
pub fn translate(
	pos: LineCol,
	from: &TextSpan,
	from_text: RopeSlice<'_>,
	to: &TextSpan,
	to_text: RopeSlice<'_>,
) -> Result<LineCol, PositionError> {
	let from_span: Span = from.to_span(from_text)?;
	let to_span: Span = to.to_span(to_text)?;
	let abs = line_col_to_char(from_text, pos)?;
	let delta = abs.saturating_sub(from_span.start);
	let target = to_span.start.saturating_add(delta).min(to_span.end);
	crate::position::char_to_line_col(to_text, target)
}
