//! Editor bridge between an authored template document and the document
//! generated from it.
//!
//! The author edits a *primary* document. A generator turns it into a
//! *secondary* document in a language the host already understands, plus a
//! batch of correspondences between ranges of the two and a batch of paint
//! ranges for template constructs with no secondary counterpart.
//!
//! - [`DocumentPair`] owns the secondary buffer and both batches, detects
//!   primary changes and installs each generation result as a whole.
//! - [`DocumentRegistry`] keeps at most one pair per primary buffer.
//! - [`Colorizer`] layers paint under the contained language's own
//!   highlighting for each requested line.
//! - [`ViewBridge`] wedges into a view's command chain, forwarding trigger
//!   characters to the generation service and queries to the contained
//!   language's view filter.
//! - [`Language`] ties these together for one host and publishes the color
//!   table.
//!
//! Everything the host owns (buffers, views, the contained-language
//! service, the generator) is reached through the traits in [`host`] and
//! [`generation`].
//!
//! ## Cargo features
//!
//! - `test-utils`: test doubles for the host collaborators in [`testing`].

pub mod buffer;
pub mod colorizer;
pub mod coordinator;
mod error;
pub mod generation;
pub mod host;
pub mod language;
pub mod registry;
pub mod settings;
pub mod source;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod view;

pub use buffer::{RopeBuffer, RopeBufferAllocator};
pub use colorizer::Colorizer;
pub use coordinator::{IntellisenseHost, SpanCoordinator};
pub use error::{Error, Result};
pub use generation::{
	AdviseCookie, GeneratedOutput, GenerationService, GenerationSink, Generator, LanguageSupervisor,
	SourceSupervisor, SupervisorFactory,
};
pub use language::{ColorIndex, ColorableItem, FontFlags, Language, PALETTE, TokenClass};
pub use registry::DocumentRegistry;
pub use settings::{IndentPolicy, Settings, SettingsError};
pub use source::{ApplyOutcome, DocumentPair, PairState};
pub use view::ViewBridge;
