//! Error types for the document bridge.

use tandem_primitives::PositionError;
use thiserror::Error;

use crate::settings::SettingsError;

/// A convenient type alias for `Result` with `E` = [`enum@Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the bridge.
///
/// A text comparison that finds nothing to do, or an optional collaborator
/// that is not attached yet, is never an error; those are reported through
/// [`crate::ApplyOutcome`] and `Option` instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
	/// A required collaborator could not be obtained from the host.
	#[error("{0} is unavailable")]
	Unavailable(&'static str),

	/// Setting up a document pair or view bridge failed.
	#[error("initialization failed: {0}")]
	Initialization(#[source] Box<Error>),

	/// A host buffer refused an edit.
	#[error("buffer error: {0}")]
	Buffer(String),

	/// The code generator failed to produce secondary text.
	#[error("generation failed: {0}")]
	Generation(String),

	/// A coordinate did not exist in the text it was resolved against.
	#[error(transparent)]
	Position(#[from] PositionError),

	/// A colorable item index outside both color bands.
	#[error("no colorable item at index {0}")]
	InvalidColorableItem(usize),

	/// Settings could not be read or parsed.
	#[error(transparent)]
	Settings(#[from] SettingsError),
}

impl Error {
	/// Wraps `self` as a construction failure, leaving existing wrappers alone.
	pub(crate) fn into_initialization(self) -> Self {
		match self {
			Self::Initialization(_) => self,
			other => Self::Initialization(Box::new(other)),
		}
	}
}
