//! Author-facing highlighting ranges with no secondary-document equivalent.

use crate::range::Span;

/// Color class meaning "leave the attribute alone".
pub const NO_COLOR: u32 = 0;

/// A primary-coordinate range painted with one color class.
///
/// Color classes are local to this language; they are biased by the
/// contained language's class count before reaching the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PaintEntry {
	pub span: Span,
	pub color: u32,
}

impl PaintEntry {
	pub const fn new(start: usize, end: usize, color: u32) -> Self {
		Self {
			span: Span { start, end },
			color,
		}
	}

	#[inline]
	pub fn is_override(&self) -> bool {
		self.color != NO_COLOR
	}
}

/// An ordered, immutable batch of [`PaintEntry`]s from one generation pass.
///
/// Order matters: when entries overlap, later ones win.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaintTable {
	entries: Vec<PaintEntry>,
}

impl PaintTable {
	pub fn new(entries: Vec<PaintEntry>) -> Self {
		Self { entries }
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn entries(&self) -> &[PaintEntry] {
		&self.entries
	}

	/// Entries that intersect `bounds`, each clipped to it, in batch order.
	pub fn clipped_to(&self, bounds: Span) -> impl Iterator<Item = (Span, u32)> + '_ {
		self.entries
			.iter()
			.filter_map(move |p| p.span.clip(&bounds).map(|s| (s, p.color)))
	}
}

impl FromIterator<PaintEntry> for PaintTable {
	fn from_iter<I: IntoIterator<Item = PaintEntry>>(iter: I) -> Self {
		Self::new(iter.into_iter().collect())
	}
}
