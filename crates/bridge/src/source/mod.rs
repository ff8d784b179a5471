//! The document pair: a primary buffer, its generated secondary buffer, and
//! the mapping and paint batches relating the two.
//!
//! A pair moves through three states. It is [`PairState::Uninitialized`]
//! until a generation service is attached, [`PairState::Ready`] while its
//! batches match the last seen primary text, and
//! [`PairState::Regenerating`] from a change notification until the
//! generation result is applied.

use std::fmt;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tandem_primitives::{MappingTable, PaintTable, Rope, TextSpan};
use tracing::{debug, trace, warn};

use crate::coordinator::{IntellisenseHost, SpanCoordinator};
use crate::generation::{AdviseCookie, GeneratedOutput, GenerationService, GenerationSink};
use crate::host::{
	BufferId, ContainedLanguage, DocumentTable, HostServices, ProjectReferences, TextBuffer,
	ViewFilter, ViewId,
};
use crate::settings::{IndentPolicy, Settings};
use crate::{Error, Result};

/// Lifecycle of a [`DocumentPair`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairState {
	Uninitialized,
	Ready,
	Regenerating,
}

/// Result of applying one generation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
	/// Secondary text, mappings and paint were replaced.
	Applied,
	/// The secondary text was already current; nothing changed.
	Unchanged,
}

/// One primary document and everything generated from it.
pub struct DocumentPair {
	id: BufferId,
	coordinator: Arc<SpanCoordinator>,
	contained: Arc<dyn ContainedLanguage>,
	paint: ArcSwap<PaintTable>,
	/// Primary text as last seen by [`DocumentPair::ensure_ready`].
	snapshot: Mutex<Rope>,
	/// Held from snapshot comparison until the generation service returns.
	regeneration: Mutex<()>,
	state: Mutex<PairState>,
	generation: RwLock<Option<(Arc<dyn GenerationService>, AdviseCookie)>>,
	views: Mutex<FxHashMap<ViewId, Option<Arc<dyn ViewFilter>>>>,
	settings: Arc<Settings>,
	documents: Option<Arc<dyn DocumentTable>>,
	project: Option<Arc<dyn ProjectReferences>>,
}

impl DocumentPair {
	/// Allocates the secondary buffer, binds the contained language to it and
	/// snapshots the primary text.
	///
	/// Any missing collaborator fails the whole construction with
	/// [`Error::Initialization`].
	pub fn new(
		primary: Arc<dyn TextBuffer>,
		services: &HostServices,
		settings: Arc<Settings>,
	) -> Result<Arc<Self>> {
		Self::build(primary, services, settings).map_err(Error::into_initialization)
	}

	fn build(
		primary: Arc<dyn TextBuffer>,
		services: &HostServices,
		settings: Arc<Settings>,
	) -> Result<Arc<Self>> {
		let secondary = services
			.require_buffers()?
			.create(&settings.language.contained)?;
		let factory = services.require_contained()?;
		let coordinator = Arc::new(SpanCoordinator::new(primary.clone(), secondary));
		let contained = factory.language(IntellisenseHost::new(coordinator.clone()))?;
		let snapshot = primary.snapshot();

		debug!(
			primary = %primary.id(),
			secondary = %coordinator.secondary().id(),
			contained = %settings.language.contained,
			"Document pair created"
		);

		Ok(Arc::new(Self {
			id: primary.id(),
			coordinator,
			contained,
			paint: ArcSwap::from_pointee(PaintTable::default()),
			snapshot: Mutex::new(snapshot),
			regeneration: Mutex::new(()),
			state: Mutex::new(PairState::Uninitialized),
			generation: RwLock::new(None),
			views: Mutex::new(FxHashMap::default()),
			settings,
			documents: services.documents.clone(),
			project: services.project.clone(),
		}))
	}

	/// Identity of the primary buffer.
	pub fn id(&self) -> BufferId {
		self.id
	}

	pub fn state(&self) -> PairState {
		*self.state.lock()
	}

	pub fn coordinator(&self) -> &Arc<SpanCoordinator> {
		&self.coordinator
	}

	pub fn contained(&self) -> &Arc<dyn ContainedLanguage> {
		&self.contained
	}

	pub fn settings(&self) -> &Arc<Settings> {
		&self.settings
	}

	pub fn generation_service(&self) -> Option<Arc<dyn GenerationService>> {
		self.generation.read().as_ref().map(|(s, _)| s.clone())
	}

	/// The current paint batch. Later regenerations do not affect the returned table.
	pub fn paint(&self) -> Arc<PaintTable> {
		self.paint.load_full()
	}

	/// The current mapping batch.
	pub fn mappings(&self) -> Arc<MappingTable> {
		self.coordinator.mappings()
	}

	pub fn secondary_text(&self) -> Rope {
		self.coordinator.secondary().snapshot()
	}

	/// Replaces the generation service.
	///
	/// The previous service, if any, is unadvised first. A new service is
	/// advised and immediately asked to generate from the current snapshot.
	pub fn set_generation_service(
		self: &Arc<Self>,
		service: Option<Arc<dyn GenerationService>>,
	) -> Result<()> {
		let previous = self.generation.write().take();
		if let Some((old, cookie)) = previous {
			old.unadvise(cookie);
		}

		let Some(service) = service else {
			*self.state.lock() = PairState::Uninitialized;
			return Ok(());
		};

		let weak: Weak<Self> = Arc::downgrade(self);
		let sink: Weak<dyn GenerationSink> = weak;
		let cookie = service.advise(sink);
		*self.generation.write() = Some((service.clone(), cookie));
		debug!(primary = %self.id, cookie = cookie.0, "Generation service attached");

		let _regeneration = self.regeneration.lock();
		self.regenerate(&service)
	}

	/// Regenerates if the primary text differs from the last snapshot.
	///
	/// Returns `Ok(false)` without touching anything when the text is
	/// unchanged. On failure the change stays pending. Concurrent callers are serialized, so a pass for an older
	/// snapshot always finishes before a newer snapshot is taken.
	pub fn ensure_ready(&self) -> Result<bool> {
		let service = self
			.generation_service()
			.ok_or(Error::Unavailable("generation service"))?;

		let _regeneration = self.regeneration.lock();
		let current = self.coordinator.primary().snapshot();
		let seen = {
			let mut snapshot = self.snapshot.lock();
			if *snapshot == current {
				return Ok(false);
			}
			std::mem::replace(&mut *snapshot, current)
		};

		if let Err(e) = self.regenerate(&service) {
			// Forget the new text so the next call retries it.
			*self.snapshot.lock() = seen;
			return Err(e);
		}
		Ok(true)
	}

	/// Notifies `service` of a change. Only [`DocumentPair::apply`] moves the
	/// pair back to [`PairState::Ready`]; a failed notification restores the
	/// previous state.
	fn regenerate(&self, service: &Arc<dyn GenerationService>) -> Result<()> {
		let previous = std::mem::replace(&mut *self.state.lock(), PairState::Regenerating);
		trace!(primary = %self.id, "Primary text changed");
		// The service may call back into `apply`; the state and snapshot locks must be free.
		let result = service.primary_text_changed(true);
		if let Err(e) = &result {
			warn!(primary = %self.id, error = %e, "Generation request failed");
			let mut state = self.state.lock();
			if *state == PairState::Regenerating {
				*state = previous;
			}
		}
		result
	}

	/// Installs a complete generation result.
	///
	/// Identical secondary text is a no-op. Otherwise the secondary buffer
	/// is replaced in one edit, a non-empty mapping batch replaces the
	/// installed one, and the paint batch is replaced unconditionally.
	pub fn apply(&self, output: GeneratedOutput) -> Result<ApplyOutcome> {
		let secondary = self.coordinator.secondary();
		if secondary.snapshot() == output.secondary_text.as_str() {
			trace!(primary = %self.id, "Secondary text unchanged");
			*self.state.lock() = PairState::Ready;
			return Ok(ApplyOutcome::Unchanged);
		}

		secondary.replace_all(&output.secondary_text)?;

		if output.correspondences.is_empty() {
			debug!(primary = %self.id, "Empty mapping batch; keeping installed mappings");
		} else {
			let primary_text = self.coordinator.primary().snapshot();
			let secondary_text = secondary.snapshot();
			let clipped = output
				.correspondences
				.iter()
				.filter(|c| !c.is_within(primary_text.len_chars(), secondary_text.len_chars()))
				.count();
			if clipped > 0 {
				warn!(primary = %self.id, clipped, "Clipping out-of-range correspondences");
			}
			self.coordinator.install(MappingTable::from_raw(
				&output.correspondences,
				primary_text.slice(..),
				secondary_text.slice(..),
			));
		}

		debug!(primary = %self.id, paints = output.paints.len(), "Installing paint batch");
		self.paint.store(Arc::new(PaintTable::new(output.paints)));
		*self.state.lock() = PairState::Ready;
		Ok(ApplyOutcome::Applied)
	}

	/// Indentation for `line`. The policy is static.
	pub fn line_indent(&self, _line: usize) -> IndentPolicy {
		self.settings.indent.clone()
	}

	/// The primary span at which a secondary span is visible.
	pub fn nearest_visible_token(&self, span: TextSpan) -> TextSpan {
		span
	}

	/// Full text of another open document, looked up by canonical name.
	pub fn running_document_text(&self, canonical_name: &str) -> Option<String> {
		let buffer = self.documents.as_ref()?.find(canonical_name)?;
		Some(buffer.snapshot().to_string())
	}

	/// Page base type implied by the project's references.
	pub fn default_page_base_type(&self) -> Option<String> {
		let references = self.project.as_ref()?.references();
		self.settings
			.page_base_type_for(&references)
			.map(str::to_string)
	}

	/// Records a view opened over this pair.
	pub fn attach_view(&self, view: ViewId) {
		self.views.lock().entry(view).or_insert(None);
	}

	/// Records the contained-language filter created for `view`.
	pub fn register_view_filter(&self, view: ViewId, filter: Arc<dyn ViewFilter>) {
		self.views.lock().insert(view, Some(filter));
	}

	/// Forgets `view`, closing its filter. Returns how many views remain.
	pub fn detach_view(&self, view: ViewId) -> usize {
		let mut views = self.views.lock();
		if let Some(Some(filter)) = views.remove(&view) {
			filter.close();
		}
		views.len()
	}

	pub fn view_count(&self) -> usize {
		self.views.lock().len()
	}

	/// Detaches the generation service and closes every remaining view filter.
	pub fn teardown(&self) {
		let previous = self.generation.write().take();
		if let Some((service, cookie)) = previous {
			service.unadvise(cookie);
		}

		let mut views = self.views.lock();
		for (view, filter) in views.drain() {
			if let Some(filter) = filter {
				trace!(primary = %self.id, %view, "Closing view filter");
				filter.close();
			}
		}
		*self.state.lock() = PairState::Uninitialized;
		debug!(primary = %self.id, "Document pair torn down");
	}
}

impl GenerationSink for DocumentPair {
	fn primary_text(&self) -> Rope {
		self.snapshot.lock().clone()
	}

	fn on_generated(&self, output: GeneratedOutput) -> Result<ApplyOutcome> {
		self.apply(output)
	}
}

impl fmt::Debug for DocumentPair {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DocumentPair")
			.field("id", &self.id)
			.field("state", &self.state())
			.field("coordinator", &self.coordinator)
			.field("paint", &self.paint.load().len())
			.field("views", &self.view_count())
			.finish_non_exhaustive()
	}
}
