//! The primary/secondary buffer pair and its installed mapping batch.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tandem_primitives::mapping::translate;
use tandem_primitives::{LineCol, MappingTable, TextSpan};
use tracing::debug;

use crate::host::TextBuffer;

/// Couples a primary buffer with its generated secondary buffer.
///
/// The mapping batch is swapped as a whole: readers hold either the previous
/// table or the new one, never a mix.
pub struct SpanCoordinator {
	primary: Arc<dyn TextBuffer>,
	secondary: Arc<dyn TextBuffer>,
	mappings: ArcSwap<MappingTable>,
}

impl SpanCoordinator {
	pub fn new(primary: Arc<dyn TextBuffer>, secondary: Arc<dyn TextBuffer>) -> Self {
		Self {
			primary,
			secondary,
			mappings: ArcSwap::from_pointee(MappingTable::default()),
		}
	}

	pub fn primary(&self) -> &Arc<dyn TextBuffer> {
		&self.primary
	}

	pub fn secondary(&self) -> &Arc<dyn TextBuffer> {
		&self.secondary
	}

	/// The currently installed mapping batch.
	pub fn mappings(&self) -> Arc<MappingTable> {
		self.mappings.load_full()
	}

	/// Replaces the mapping batch in full.
	pub fn install(&self, table: MappingTable) {
		debug!(
			primary = %self.primary.id(),
			secondary = %self.secondary.id(),
			entries = table.len(),
			"Installing span mappings"
		);
		self.mappings.store(Arc::new(table));
	}

	/// Maps a primary position into secondary coordinates.
	///
	/// Returns `None` when no installed entry covers `pos`.
	pub fn map_primary_to_secondary(&self, pos: LineCol) -> Option<LineCol> {
		let table = self.mappings();
		let entry = table.find_primary(pos)?;
		let primary = self.primary.snapshot();
		let secondary = self.secondary.snapshot();
		translate(
			pos,
			&entry.primary,
			primary.slice(..),
			&entry.secondary,
			secondary.slice(..),
		)
		.ok()
	}

	/// Maps a secondary position back into primary coordinates.
	pub fn map_secondary_to_primary(&self, pos: LineCol) -> Option<LineCol> {
		let table = self.mappings();
		let entry = table.find_secondary(pos)?;
		let primary = self.primary.snapshot();
		let secondary = self.secondary.snapshot();
		translate(
			pos,
			&entry.secondary,
			secondary.slice(..),
			&entry.primary,
			primary.slice(..),
		)
		.ok()
	}
}

impl fmt::Debug for SpanCoordinator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SpanCoordinator")
			.field("primary", &self.primary.id())
			.field("secondary", &self.secondary.id())
			.field("mappings", &self.mappings.load().len())
			.finish()
	}
}

/// The editing host handed to the contained-language service.
///
/// Lets the service resolve positions through the pair's current mapping
/// without holding the pair itself.
#[derive(Clone, Debug)]
pub struct IntellisenseHost {
	coordinator: Arc<SpanCoordinator>,
}

impl IntellisenseHost {
	pub fn new(coordinator: Arc<SpanCoordinator>) -> Self {
		Self { coordinator }
	}

	pub fn coordinator(&self) -> &Arc<SpanCoordinator> {
		&self.coordinator
	}

	pub fn to_secondary(&self, pos: LineCol) -> Option<LineCol> {
		self.coordinator.map_primary_to_secondary(pos)
	}

	pub fn to_primary(&self, pos: LineCol) -> Option<LineCol> {
		self.coordinator.map_secondary_to_primary(pos)
	}

	/// Maps a whole secondary span into the primary buffer.
	///
	/// Both ends must be covered by the installed mapping.
	pub fn span_to_primary(&self, span: TextSpan) -> Option<TextSpan> {
		let start = self.to_primary(span.start)?;
		let end = if span.end == span.start {
			start
		} else {
			self.to_primary(span.end)
				.or_else(|| self.end_inclusive_to_primary(span.end))?
		};
		Some(TextSpan::new(start, end))
	}

	/// An exclusive end sits one past the covered range, so map the last
	/// covered column instead and step past it.
	fn end_inclusive_to_primary(&self, end: LineCol) -> Option<LineCol> {
		let last = LineCol::new(end.line, end.col.checked_sub(1)?);
		let mapped = self.to_primary(last)?;
		Some(LineCol::new(mapped.line, mapped.col + 1))
	}
}
