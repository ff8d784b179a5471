//! Document registry.
//!
//! Maps each primary buffer to its single [`DocumentPair`]. Pairs are owned
//! here by strong reference and leave only through [`DocumentRegistry::release`].

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::host::{BufferId, HostServices, TextBuffer, ViewId};
use crate::settings::Settings;
use crate::source::DocumentPair;
use crate::{Error, Result};

/// Registry of live document pairs, keyed by primary buffer.
///
/// Thread-safe; shared across views via `Arc<DocumentRegistry>`.
pub struct DocumentRegistry {
	pairs: Mutex<FxHashMap<BufferId, Arc<DocumentPair>>>,
	services: HostServices,
	settings: Arc<Settings>,
}

impl DocumentRegistry {
	pub fn new(services: HostServices, settings: Arc<Settings>) -> Self {
		Self {
			pairs: Mutex::new(FxHashMap::default()),
			services,
			settings,
		}
	}

	pub fn services(&self) -> &HostServices {
		&self.services
	}

	pub fn settings(&self) -> &Arc<Settings> {
		&self.settings
	}

	/// Returns the pair for `primary`, creating it on first reference.
	///
	/// Lookup, construction and insertion happen under one lock, so
	/// concurrent callers for the same buffer all receive the same pair.
	/// A new pair is attached to the generation service before it becomes
	/// visible.
	pub fn get_or_create(&self, primary: &Arc<dyn TextBuffer>) -> Result<Arc<DocumentPair>> {
		let mut pairs = self.pairs.lock();
		self.lookup_or_create(&mut pairs, primary)
	}

	/// [`DocumentRegistry::get_or_create`], recording `view` as open over
	/// the pair before the lock is released.
	pub fn attach_view(&self, primary: &Arc<dyn TextBuffer>, view: ViewId) -> Result<Arc<DocumentPair>> {
		let mut pairs = self.pairs.lock();
		let pair = self.lookup_or_create(&mut pairs, primary)?;
		pair.attach_view(view);
		Ok(pair)
	}

	/// Detaches `view` from `pair`, releasing the pair once no view remains.
	///
	/// Returns true if the pair was released.
	pub fn detach_view(&self, pair: &Arc<DocumentPair>, view: ViewId) -> bool {
		let mut pairs = self.pairs.lock();
		let remaining = pair.detach_view(view);
		trace!(primary = %pair.id(), %view, remaining, "View detached");
		if remaining > 0 || !pairs.get(&pair.id()).is_some_and(|p| Arc::ptr_eq(p, pair)) {
			return false;
		}
		pairs.remove(&pair.id());
		debug!(primary = %pair.id(), "Releasing idle document pair");
		pair.teardown();
		true
	}

	fn lookup_or_create(
		&self,
		pairs: &mut FxHashMap<BufferId, Arc<DocumentPair>>,
		primary: &Arc<dyn TextBuffer>,
	) -> Result<Arc<DocumentPair>> {
		let id = primary.id();
		if let Some(pair) = pairs.get(&id) {
			debug!(primary = %id, "Document pair found");
			return Ok(pair.clone());
		}

		debug!(primary = %id, "Creating document pair");
		let pair = DocumentPair::new(primary.clone(), &self.services, self.settings.clone())?;
		self.attach_generation(&pair)
			.map_err(Error::into_initialization)?;
		pairs.insert(id, pair.clone());
		Ok(pair)
	}

	fn attach_generation(&self, pair: &Arc<DocumentPair>) -> Result<()> {
		let supervisor = self.services.require_supervisor()?;
		let service = supervisor.on_source_associated(pair)?;
		pair.set_generation_service(Some(service))
	}

	pub fn get(&self, primary: BufferId) -> Option<Arc<DocumentPair>> {
		self.pairs.lock().get(&primary).cloned()
	}

	/// Removes and tears down the pair for `primary`.
	pub fn release(&self, primary: BufferId) -> Option<Arc<DocumentPair>> {
		let pair = self.pairs.lock().remove(&primary)?;
		debug!(primary = %primary, "Releasing document pair");
		pair.teardown();
		Some(pair)
	}

	pub fn len(&self) -> usize {
		self.pairs.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.pairs.lock().is_empty()
	}
}

impl fmt::Debug for DocumentRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DocumentRegistry")
			.field("pairs", &self.len())
			.field("services", &self.services)
			.finish_non_exhaustive()
	}
}
