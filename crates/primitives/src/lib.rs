//! Coordinate primitives shared by the primary/secondary document bridge:
//! positions, ranges, correspondence batches, and paint batches.

/// Correspondence entries between primary and secondary ranges.
pub mod mapping;
/// Author-facing paint ranges.
pub mod paint;
/// Offset and line/column conversions.
pub mod position;
/// Half-open character ranges.
pub mod range;

pub use mapping::{MappingTable, RawCorrespondence, SpanMapping};
pub use paint::{NO_COLOR, PaintEntry, PaintTable};
pub use position::{LineCol, PositionError, char_to_line_col, line_col_to_char, line_len, line_start};
pub use range::{CharIdx, CharLen, Span, TextSpan};
pub use ropey::{Rope, RopeSlice};
