//! Collaborators owned by the host environment.
//!
//! Text storage, views, the contained-language service, and project lookup
//! all live outside this crate. Each is reached through one of the traits
//! below, bundled per language in [`HostServices`].

use std::borrow::Cow;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use bitflags::bitflags;
use tandem_primitives::{LineCol, Rope, TextSpan};

use crate::Result;
use crate::coordinator::IntellisenseHost;
use crate::generation::LanguageSupervisor;
use crate::language::ColorableItem;

/// Identity of a host text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Identity of a host editor view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub u64);

impl fmt::Display for BufferId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "buffer#{}", self.0)
	}
}

impl fmt::Display for ViewId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "view#{}", self.0)
	}
}

/// A text buffer with a line index.
///
/// Snapshots are cheap rope clones; the line index used for every
/// offset/line conversion is the snapshot's own.
pub trait TextBuffer: Send + Sync {
	fn id(&self) -> BufferId;

	/// Current full contents.
	fn snapshot(&self) -> Rope;

	/// Replaces the entire contents in one edit.
	fn replace_all(&self, text: &str) -> Result<()>;
}

/// Allocates fresh secondary buffers.
pub trait BufferAllocator: Send + Sync {
	/// Creates an empty buffer owned by the named language service.
	fn create(&self, language: &str) -> Result<Arc<dyn TextBuffer>>;
}

/// Looks up open documents by canonical name.
pub trait DocumentTable: Send + Sync {
	fn find(&self, canonical_name: &str) -> Option<Arc<dyn TextBuffer>>;
}

/// The project a document belongs to.
pub trait ProjectReferences: Send + Sync {
	/// Names of the assemblies or packages the project references, in order.
	fn references(&self) -> Vec<String>;
}

/// Creates the contained-language service for a document pair.
pub trait ContainedLanguageFactory: Send + Sync {
	/// Binds a contained-language instance to a pair's buffers and mapping.
	fn language(&self, host: IntellisenseHost) -> Result<Arc<dyn ContainedLanguage>>;

	/// Number of color classes the contained language claims.
	fn color_class_count(&self) -> usize;

	/// The contained language's colorable item at `index` (1-based; 0 is reserved).
	fn colorable_item(&self, index: usize) -> Option<ColorableItem>;
}

/// A contained-language service bound to one document pair.
pub trait ContainedLanguage: Send + Sync {
	/// The line-fragment colorizer, when the service offers one.
	fn colorizer(&self) -> Option<Arc<dyn ContainedColorizer>>;

	/// Creates the service's filter for one view.
	///
	/// `next` is the command target the filter should hand commands on to.
	/// Returns `None` when the service has no filter for this view yet.
	fn text_view_filter(
		&self,
		host: IntellisenseHost,
		next: Option<Arc<dyn CommandTarget>>,
	) -> Result<Option<Arc<dyn ViewFilter>>>;

	/// Called once a view's command chain is in place.
	fn on_editor_ready(&self) -> Result<()> {
		Ok(())
	}
}

/// A sub-range of one primary line backed by secondary text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFragment<'a> {
	/// Primary line number.
	pub line: usize,
	/// Covered columns of the primary line.
	pub columns: Range<usize>,
	/// Full text of the primary line.
	pub line_text: &'a str,
	/// The corresponding secondary range.
	pub secondary: TextSpan,
	/// Secondary text for `secondary`.
	pub secondary_text: Cow<'a, str>,
}

/// Colorizes fragments of primary lines from the secondary language's point of view.
pub trait ContainedColorizer: Send + Sync {
	/// Writes one attribute per column of `fragment.columns` into `attrs`.
	///
	/// `attrs.len()` always equals `fragment.columns.len()`.
	fn colorize_fragment(&self, fragment: &LineFragment<'_>, attrs: &mut [u32]);
}

/// Editor commands routed through a view's command chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	TypeChar(char),
	Backspace,
	Return,
	Tab,
	CompleteWord,
	ShowMemberList,
	ParameterInfo,
	QuickInfo,
	/// Any command not modelled above, by host-specific id.
	Other(u32),
}

/// Whether a command target handles a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
	Supported,
	Unsupported,
}

/// A link in a view's command-handling chain.
pub trait CommandTarget: Send + Sync {
	fn query_status(&self, command: &Command) -> CommandStatus;

	fn exec(&self, command: &Command) -> Result<()>;
}

bitflags! {
	/// Options for word-extent queries.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
	pub struct WordExtentFlags: u32 {
		/// Extent of the word at the position.
		const CURRENT = 1 << 0;
		/// Extent of the next word.
		const NEXT = 1 << 1;
		/// Extent of the previous word.
		const PREV = 1 << 2;
		/// Treat the position as the caret rather than a character.
		const CARET = 1 << 3;
	}
}

/// A tooltip produced for a span of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataTip {
	pub span: TextSpan,
	pub text: String,
}

/// The contained language's per-view filter.
pub trait ViewFilter: CommandTarget {
	fn word_extent(&self, at: LineCol, flags: WordExtentFlags) -> Option<TextSpan>;

	fn data_tip_text(&self, span: TextSpan) -> Option<DataTip>;

	/// Extents of the bracket at `at` and its partner.
	fn pair_extents(&self, at: LineCol) -> Option<(TextSpan, TextSpan)>;

	/// Releases the filter when its view closes.
	fn close(&self) {}
}

/// A host editor view.
pub trait TextView: Send + Sync {
	fn id(&self) -> ViewId;

	/// The primary buffer this view shows.
	fn buffer(&self) -> Arc<dyn TextBuffer>;

	/// Puts `filter` at the head of the command chain, returning the previous head.
	fn add_command_filter(
		&self,
		filter: Arc<dyn CommandTarget>,
	) -> Result<Option<Arc<dyn CommandTarget>>>;

	fn remove_command_filter(&self, filter: &Arc<dyn CommandTarget>);
}

/// Collaborators the host provides to one language.
///
/// Missing entries surface as [`crate::Error::Unavailable`] when a document
/// pair first needs them; optional ones only switch their feature off.
#[derive(Clone, Default)]
pub struct HostServices {
	pub buffers: Option<Arc<dyn BufferAllocator>>,
	pub contained: Option<Arc<dyn ContainedLanguageFactory>>,
	pub supervisor: Option<Arc<dyn LanguageSupervisor>>,
	pub documents: Option<Arc<dyn DocumentTable>>,
	pub project: Option<Arc<dyn ProjectReferences>>,
}

impl HostServices {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_buffers(mut self, buffers: Arc<dyn BufferAllocator>) -> Self {
		self.buffers = Some(buffers);
		self
	}

	pub fn with_contained(mut self, contained: Arc<dyn ContainedLanguageFactory>) -> Self {
		self.contained = Some(contained);
		self
	}

	pub fn with_supervisor(mut self, supervisor: Arc<dyn LanguageSupervisor>) -> Self {
		self.supervisor = Some(supervisor);
		self
	}

	pub fn with_documents(mut self, documents: Arc<dyn DocumentTable>) -> Self {
		self.documents = Some(documents);
		self
	}

	pub fn with_project(mut self, project: Arc<dyn ProjectReferences>) -> Self {
		self.project = Some(project);
		self
	}

	pub(crate) fn require_buffers(&self) -> Result<&Arc<dyn BufferAllocator>> {
		self.buffers
			.as_ref()
			.ok_or(crate::Error::Unavailable("secondary buffer allocator"))
	}

	pub(crate) fn require_contained(&self) -> Result<&Arc<dyn ContainedLanguageFactory>> {
		self.contained
			.as_ref()
			.ok_or(crate::Error::Unavailable("contained-language service"))
	}

	pub(crate) fn require_supervisor(&self) -> Result<&Arc<dyn LanguageSupervisor>> {
		self.supervisor
			.as_ref()
			.ok_or(crate::Error::Unavailable("generation service"))
	}
}

impl fmt::Debug for HostServices {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HostServices")
			.field("buffers", &self.buffers.is_some())
			.field("contained", &self.contained.is_some())
			.field("supervisor", &self.supervisor.is_some())
			.field("documents", &self.documents.is_some())
			.field("project", &self.project.is_some())
			.finish()
	}
}
