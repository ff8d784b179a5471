//! Test doubles for the host collaborators.
//!
//! Available to this crate's tests and, through the `test-utils` feature, to
//! downstream integration tests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tandem_primitives::{LineCol, PaintEntry, RawCorrespondence, TextSpan};

use crate::Result;
use crate::buffer::RopeBufferAllocator;
use crate::coordinator::IntellisenseHost;
use crate::generation::{
	AdviseCookie, GeneratedOutput, GenerationService, GenerationSink, Generator, LanguageSupervisor,
	SupervisorFactory,
};
use crate::host::{
	Command, CommandStatus, CommandTarget, ContainedColorizer, ContainedLanguage,
	ContainedLanguageFactory, DataTip, DocumentTable, HostServices, LineFragment,
	ProjectReferences, TextBuffer, TextView, ViewFilter, ViewId, WordExtentFlags,
};
use crate::language::ColorableItem;
use crate::source::DocumentPair;

/// Colors secondary text by character kind: letters 1, digits 2, anything else 3.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordColorizer;

impl WordColorizer {
	pub fn class_of(ch: char) -> u32 {
		if ch.is_alphabetic() {
			1
		} else if ch.is_ascii_digit() {
			2
		} else {
			3
		}
	}
}

impl ContainedColorizer for WordColorizer {
	fn colorize_fragment(&self, fragment: &LineFragment<'_>, attrs: &mut [u32]) {
		for (attr, ch) in attrs.iter_mut().zip(fragment.secondary_text.chars()) {
			*attr = Self::class_of(ch);
		}
	}
}

/// Contained-language factory handing out [`MockContainedLanguage`]s.
pub struct MockContainedFactory {
	colorizer: Option<Arc<dyn ContainedColorizer>>,
	class_count: usize,
	provide_filter: bool,
	fail: bool,
	languages: Mutex<Vec<Arc<MockContainedLanguage>>>,
}

impl MockContainedFactory {
	/// A factory whose languages color with [`WordColorizer`] and claim `class_count` classes.
	pub fn new(class_count: usize) -> Self {
		Self {
			colorizer: Some(Arc::new(WordColorizer)),
			class_count,
			provide_filter: true,
			fail: false,
			languages: Mutex::new(Vec::new()),
		}
	}

	pub fn without_colorizer(mut self) -> Self {
		self.colorizer = None;
		self
	}

	pub fn without_filter(mut self) -> Self {
		self.provide_filter = false;
		self
	}

	pub fn failing(mut self) -> Self {
		self.fail = true;
		self
	}

	/// Every language created so far, oldest first.
	pub fn languages(&self) -> Vec<Arc<MockContainedLanguage>> {
		self.languages.lock().clone()
	}
}

impl ContainedLanguageFactory for MockContainedFactory {
	fn language(&self, host: IntellisenseHost) -> Result<Arc<dyn ContainedLanguage>> {
		if self.fail {
			return Err(crate::Error::Unavailable("contained-language service"));
		}
		let language = Arc::new(MockContainedLanguage {
			host,
			colorizer: self.colorizer.clone(),
			provide_filter: self.provide_filter,
			editor_ready: AtomicUsize::new(0),
			filters: Mutex::new(Vec::new()),
		});
		self.languages.lock().push(language.clone());
		Ok(language)
	}

	fn color_class_count(&self) -> usize {
		self.class_count
	}

	fn colorable_item(&self, index: usize) -> Option<ColorableItem> {
		(1..=self.class_count)
			.contains(&index)
			.then(|| ColorableItem::plain(format!("Contained {index}")))
	}
}

/// A contained language bound to one pair.
pub struct MockContainedLanguage {
	host: IntellisenseHost,
	colorizer: Option<Arc<dyn ContainedColorizer>>,
	provide_filter: bool,
	editor_ready: AtomicUsize,
	filters: Mutex<Vec<Arc<MockViewFilter>>>,
}

impl MockContainedLanguage {
	pub fn host(&self) -> &IntellisenseHost {
		&self.host
	}

	/// How many times a view reported its command chain ready.
	pub fn editor_ready_count(&self) -> usize {
		self.editor_ready.load(Ordering::SeqCst)
	}

	pub fn filters(&self) -> Vec<Arc<MockViewFilter>> {
		self.filters.lock().clone()
	}
}

impl ContainedLanguage for MockContainedLanguage {
	fn colorizer(&self) -> Option<Arc<dyn ContainedColorizer>> {
		self.colorizer.clone()
	}

	fn text_view_filter(
		&self,
		host: IntellisenseHost,
		next: Option<Arc<dyn CommandTarget>>,
	) -> Result<Option<Arc<dyn ViewFilter>>> {
		if !self.provide_filter {
			return Ok(None);
		}
		let filter = Arc::new(MockViewFilter {
			host,
			next,
			commands: Mutex::new(Vec::new()),
			closed: AtomicBool::new(false),
		});
		self.filters.lock().push(filter.clone());
		Ok(Some(filter))
	}

	fn on_editor_ready(&self) -> Result<()> {
		self.editor_ready.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}
}

/// A view filter that records commands and hands them on.
pub struct MockViewFilter {
	host: IntellisenseHost,
	next: Option<Arc<dyn CommandTarget>>,
	commands: Mutex<Vec<Command>>,
	closed: AtomicBool,
}

impl MockViewFilter {
	pub fn commands(&self) -> Vec<Command> {
		self.commands.lock().clone()
	}

	pub fn is_closed(&self) -> bool {
		self.closed.load(Ordering::SeqCst)
	}
}

impl CommandTarget for MockViewFilter {
	fn query_status(&self, command: &Command) -> CommandStatus {
		match command {
			Command::CompleteWord | Command::QuickInfo => CommandStatus::Supported,
			_ => self
				.next
				.as_ref()
				.map_or(CommandStatus::Unsupported, |n| n.query_status(command)),
		}
	}

	fn exec(&self, command: &Command) -> Result<()> {
		self.commands.lock().push(command.clone());
		match &self.next {
			Some(next) => next.exec(command),
			None => Ok(()),
		}
	}
}

impl ViewFilter for MockViewFilter {
	/// The secondary word under `at`, mapped back to primary coordinates.
	fn word_extent(&self, at: LineCol, _flags: WordExtentFlags) -> Option<TextSpan> {
		let secondary_at = self.host.to_secondary(at)?;
		let secondary = self.host.coordinator().secondary().snapshot();
		let line = secondary.get_line(secondary_at.line)?;
		let chars: Vec<char> = line.chars().collect();
		let is_word = |c: &char| c.is_alphanumeric() || *c == '_';
		if !chars.get(secondary_at.col).is_some_and(is_word) {
			return None;
		}
		let start = chars[..secondary_at.col]
			.iter()
			.rposition(|c| !is_word(c))
			.map_or(0, |i| i + 1);
		let end = chars[secondary_at.col..]
			.iter()
			.position(|c| !is_word(c))
			.map_or(chars.len(), |i| secondary_at.col + i);
		self.host.span_to_primary(TextSpan::new(
			LineCol::new(secondary_at.line, start),
			LineCol::new(secondary_at.line, end),
		))
	}

	fn data_tip_text(&self, span: TextSpan) -> Option<DataTip> {
		Some(DataTip {
			span,
			text: format!("{}:{}", span.start.line, span.start.col),
		})
	}

	fn pair_extents(&self, _at: LineCol) -> Option<(TextSpan, TextSpan)> {
		None
	}

	fn close(&self) {
		self.closed.store(true, Ordering::SeqCst);
	}
}

/// The bottom of a view's command chain.
#[derive(Default)]
pub struct RecordingTarget {
	commands: Mutex<Vec<Command>>,
}

impl RecordingTarget {
	pub fn commands(&self) -> Vec<Command> {
		self.commands.lock().clone()
	}
}

impl CommandTarget for RecordingTarget {
	fn query_status(&self, _command: &Command) -> CommandStatus {
		CommandStatus::Supported
	}

	fn exec(&self, command: &Command) -> Result<()> {
		self.commands.lock().push(command.clone());
		Ok(())
	}
}

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(1);

/// A view with a stack of command filters over a [`RecordingTarget`].
pub struct MockView {
	id: ViewId,
	buffer: Arc<dyn TextBuffer>,
	base: Arc<RecordingTarget>,
	filters: Mutex<Vec<Arc<dyn CommandTarget>>>,
}

impl MockView {
	pub fn new(buffer: Arc<dyn TextBuffer>) -> Self {
		Self {
			id: ViewId(NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed)),
			buffer,
			base: Arc::new(RecordingTarget::default()),
			filters: Mutex::new(Vec::new()),
		}
	}

	pub fn base(&self) -> &Arc<RecordingTarget> {
		&self.base
	}

	pub fn filter_count(&self) -> usize {
		self.filters.lock().len()
	}

	/// Runs `command` from the head of the chain, as a keystroke would.
	pub fn exec(&self, command: &Command) -> Result<()> {
		let head = self.filters.lock().last().cloned();
		match head {
			Some(head) => head.exec(command),
			None => self.base.exec(command),
		}
	}
}

impl TextView for MockView {
	fn id(&self) -> ViewId {
		self.id
	}

	fn buffer(&self) -> Arc<dyn TextBuffer> {
		self.buffer.clone()
	}

	fn add_command_filter(
		&self,
		filter: Arc<dyn CommandTarget>,
	) -> Result<Option<Arc<dyn CommandTarget>>> {
		let mut filters = self.filters.lock();
		let previous = filters
			.last()
			.cloned()
			.unwrap_or_else(|| self.base.clone() as Arc<dyn CommandTarget>);
		filters.push(filter);
		Ok(Some(previous))
	}

	fn remove_command_filter(&self, filter: &Arc<dyn CommandTarget>) {
		self.filters.lock().retain(|f| !Arc::ptr_eq(f, filter));
	}
}

/// A generation service that records calls and never generates.
#[derive(Default)]
pub struct RecordingService {
	sinks: Mutex<FxHashMap<AdviseCookie, Weak<dyn GenerationSink>>>,
	last_cookie: AtomicU64,
	changes: AtomicUsize,
	typed: Mutex<Vec<(ViewId, char)>>,
}

impl RecordingService {
	pub fn advised(&self) -> usize {
		self.sinks.lock().len()
	}

	pub fn change_count(&self) -> usize {
		self.changes.load(Ordering::SeqCst)
	}

	pub fn typed(&self) -> Vec<(ViewId, char)> {
		self.typed.lock().clone()
	}
}

impl GenerationService for RecordingService {
	fn advise(&self, sink: Weak<dyn GenerationSink>) -> AdviseCookie {
		let cookie = AdviseCookie(self.last_cookie.fetch_add(1, Ordering::SeqCst) + 1);
		self.sinks.lock().insert(cookie, sink);
		cookie
	}

	fn unadvise(&self, cookie: AdviseCookie) {
		self.sinks.lock().remove(&cookie);
	}

	fn primary_text_changed(&self, changed: bool) -> Result<()> {
		if changed {
			self.changes.fetch_add(1, Ordering::SeqCst);
		}
		Ok(())
	}

	fn char_typed(&self, view: ViewId, ch: char) -> Result<()> {
		self.typed.lock().push((view, ch));
		Ok(())
	}
}

/// Hands every pair the same generation service.
pub struct SharedSupervisor(pub Arc<dyn GenerationService>);

impl LanguageSupervisor for SharedSupervisor {
	fn on_source_associated(&self, _source: &Arc<DocumentPair>) -> Result<Arc<dyn GenerationService>> {
		Ok(self.0.clone())
	}
}

/// A miniature template generator.
///
/// Every `@name` expression in the primary text becomes the statement
/// `name;` on its own secondary line, mapped from the name's primary range
/// to its secondary range. With a tag class set, every `<...>` tag is also
/// painted with that class.
#[derive(Debug, Default, Clone, Copy)]
pub struct ToyGenerator {
	pub tag_class: Option<u32>,
}

impl ToyGenerator {
	pub fn with_tag_class(tag_class: u32) -> Self {
		Self {
			tag_class: Some(tag_class),
		}
	}
}

impl Generator for ToyGenerator {
	fn generate(&self, primary_text: &str) -> Result<GeneratedOutput> {
		let chars: Vec<char> = primary_text.chars().collect();
		let is_ident = |c: char| c.is_alphanumeric() || c == '_';
		let mut output = GeneratedOutput::default();
		let mut secondary_len = 0;

		let mut i = 0;
		while i < chars.len() {
			match chars[i] {
				'@' => {
					let start = i + 1;
					let end = chars[start..]
						.iter()
						.position(|c| !is_ident(*c))
						.map_or(chars.len(), |n| start + n);
					if end > start {
						if !output.secondary_text.is_empty() {
							output.secondary_text.push('\n');
							secondary_len += 1;
						}
						output.secondary_text.extend(&chars[start..end]);
						output.secondary_text.push(';');
						output.correspondences.push(RawCorrespondence::new(
							start,
							end,
							secondary_len,
							secondary_len + (end - start),
						));
						secondary_len += end - start + 1;
					}
					i = end.max(start);
				}
				'<' => {
					let end = chars[i..]
						.iter()
						.position(|c| *c == '>')
						.map_or(chars.len(), |n| i + n + 1);
					if let Some(class) = self.tag_class {
						output.paints.push(PaintEntry::new(i, end, class));
					}
					i = end;
				}
				_ => i += 1,
			}
		}
		Ok(output)
	}
}

/// Open documents by canonical name.
#[derive(Default)]
pub struct MapDocuments {
	documents: Mutex<FxHashMap<String, Arc<dyn TextBuffer>>>,
}

impl MapDocuments {
	pub fn insert(&self, name: &str, buffer: Arc<dyn TextBuffer>) {
		self.documents.lock().insert(name.to_string(), buffer);
	}
}

impl DocumentTable for MapDocuments {
	fn find(&self, canonical_name: &str) -> Option<Arc<dyn TextBuffer>> {
		self.documents.lock().get(canonical_name).cloned()
	}
}

/// A project with a fixed reference list.
#[derive(Debug, Default, Clone)]
pub struct StaticProject(pub Vec<String>);

impl ProjectReferences for StaticProject {
	fn references(&self) -> Vec<String> {
		self.0.clone()
	}
}

/// Host services wired to rope buffers, a [`MockContainedFactory`] and a
/// supervisor running [`ToyGenerator`].
pub fn services(contained: Arc<MockContainedFactory>, generator: ToyGenerator) -> HostServices {
	HostServices::new()
		.with_buffers(Arc::new(RopeBufferAllocator))
		.with_contained(contained)
		.with_supervisor(Arc::new(SupervisorFactory::new(Arc::new(generator))))
}

/// Installs a fmt subscriber writing through the test harness.
#[cfg(test)]
pub(crate) fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_test_writer()
		.with_max_level(tracing::Level::TRACE)
		.try_init();
}
