//! Line colorization.
//!
//! Attributes for a primary line come from two layers. Paint entries are
//! written first, biased past the contained language's color classes. Then
//! every mapped sub-range of the line is handed to the contained language's
//! own colorizer, whose unbiased output overwrites the paint beneath it.

use std::borrow::Cow;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use tandem_primitives::mapping::translate;
use tandem_primitives::{
	LineCol, NO_COLOR, PaintTable, Rope, Span, SpanMapping, TextSpan, line_len, line_start,
};
use tracing::{trace, warn};

use crate::Result;
use crate::host::{ContainedColorizer, LineFragment};
use crate::source::DocumentPair;

/// Produces per-character color attributes for one primary buffer.
pub struct Colorizer {
	pair: Arc<DocumentPair>,
	/// Resolved once; `None` disables delegation.
	contained: Option<Arc<dyn ContainedColorizer>>,
	namespace_offset: u32,
	/// Paint batch captured by the last [`Colorizer::begin_colorization`].
	paint: Arc<PaintTable>,
}

impl Colorizer {
	/// Creates a colorizer whose paint classes are biased by `namespace_offset`.
	pub fn new(pair: Arc<DocumentPair>, namespace_offset: u32) -> Self {
		let contained = pair.contained().colorizer();
		if contained.is_none() {
			warn!(primary = %pair.id(), "Contained language has no colorizer; mapped ranges stay unhighlighted");
		}
		let paint = pair.paint();
		Self {
			pair,
			contained,
			namespace_offset,
			paint,
		}
	}

	pub fn pair(&self) -> &Arc<DocumentPair> {
		&self.pair
	}

	pub fn namespace_offset(&self) -> u32 {
		self.namespace_offset
	}

	/// Brings the secondary document up to date and captures the current paint batch.
	///
	/// The paint batch is refreshed even when regeneration fails, so the
	/// pass proceeds with whatever is installed.
	pub fn begin_colorization(&mut self) -> Result<()> {
		let ready = self.pair.ensure_ready();
		if let Err(e) = &ready {
			warn!(primary = %self.pair.id(), error = %e, "Colorizing without regeneration");
		}
		self.paint = self.pair.paint();
		ready.map(|_| ())
	}

	/// Computes attributes for `line`, `length` characters long.
	///
	/// Always returns `length + 1` entries; the last one is a sentinel and
	/// is never written. Positions nothing covers stay zero, as do columns
	/// past the end of the line.
	pub fn colorize_line(&self, line: usize, length: usize, text: &str, _state: u32) -> Vec<u32> {
		let mut attrs = vec![NO_COLOR; length + 1];
		let primary = self.pair.coordinator().primary().snapshot();

		// Columns past the end of the line in the primary text are never written.
		let extent = line_start(primary.slice(..), line)
			.and_then(|start| line_len(primary.slice(..), line).map(|len| (start, len)));
		let visible = match extent {
			Ok((start, len)) => {
				let visible = length.min(len);
				self.paint_line(&mut attrs[..visible], start);
				visible
			}
			Err(e) => {
				warn!(primary = %self.pair.id(), line, error = %e, "Skipping paint for line");
				length
			}
		};

		if let Some(contained) = &self.contained {
			self.delegate_line(contained.as_ref(), &mut attrs[..visible], line, text, &primary);
		}

		trace!(primary = %self.pair.id(), line, length, "Colorized line");
		attrs
	}

	fn paint_line(&self, attrs: &mut [u32], line_start: usize) {
		let bounds = Span {
			start: line_start,
			end: line_start + attrs.len(),
		};
		for (span, color) in self.paint.clipped_to(bounds) {
			if color == NO_COLOR {
				continue;
			}
			let biased = color.saturating_add(self.namespace_offset);
			let cols = (span.start - line_start)..(span.end - line_start);
			for attr in attrs.iter_mut().take(cols.end).skip(cols.start) {
				*attr = biased;
			}
		}
	}

	fn delegate_line(
		&self,
		contained: &dyn ContainedColorizer,
		attrs: &mut [u32],
		line: usize,
		text: &str,
		primary: &Rope,
	) {
		let mappings = self.pair.mappings();
		let secondary = self.pair.coordinator().secondary().snapshot();
		for entry in mappings.overlapping_line(line) {
			let Some(columns) = entry.primary.columns_on_line(line, attrs.len()) else {
				continue;
			};
			let Some(fragment) = fragment(entry, line, columns.clone(), text, primary, &secondary) else {
				trace!(line, ?columns, "Mapped columns have no secondary range");
				continue;
			};
			contained.colorize_fragment(&fragment, &mut attrs[columns]);
		}
	}
}

/// Builds the fragment for `columns` of `line`, resolving its secondary range through `entry`.
fn fragment<'a>(
	entry: &SpanMapping,
	line: usize,
	columns: Range<usize>,
	line_text: &'a str,
	primary: &Rope,
	secondary: &'a Rope,
) -> Option<LineFragment<'a>> {
	let to_secondary = |col: usize| {
		translate(
			LineCol::new(line, col),
			&entry.primary,
			primary.slice(..),
			&entry.secondary,
			secondary.slice(..),
		)
		.ok()
	};
	let start = to_secondary(columns.start)?;
	let end = to_secondary(columns.end)?;
	let span = TextSpan::new(start, end).to_span(secondary.slice(..)).ok()?;
	let secondary_text: Cow<'a, str> = secondary.slice(span.start..span.end).into();
	Some(LineFragment {
		line,
		columns,
		line_text,
		secondary: TextSpan::new(start, end),
		secondary_text,
	})
}

impl fmt::Debug for Colorizer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Colorizer")
			.field("primary", &self.pair.id())
			.field("contained", &self.contained.is_some())
			.field("namespace_offset", &self.namespace_offset)
			.field("paint", &self.paint.len())
			.finish()
	}
}

#[cfg(test)]
mod tests;
