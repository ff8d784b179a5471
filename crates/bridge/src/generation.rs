//! The generation service contract and its in-process supervisor.
//!
//! A [`Generator`] turns primary text into secondary text plus mapping and
//! paint batches. [`SourceSupervisor`] drives one generator on behalf of the
//! sinks advised to it, delivering each result through
//! [`GenerationSink::on_generated`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tandem_primitives::{PaintEntry, RawCorrespondence, Rope};
use tracing::{debug, trace, warn};

use crate::Result;
use crate::host::ViewId;
use crate::source::{ApplyOutcome, DocumentPair};

/// Complete output of one generation pass.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GeneratedOutput {
	pub secondary_text: String,
	pub correspondences: Vec<RawCorrespondence>,
	pub paints: Vec<PaintEntry>,
}

/// Produces secondary text and batches from primary text.
pub trait Generator: Send + Sync {
	fn generate(&self, primary_text: &str) -> Result<GeneratedOutput>;
}

impl<F> Generator for F
where
	F: Fn(&str) -> Result<GeneratedOutput> + Send + Sync,
{
	fn generate(&self, primary_text: &str) -> Result<GeneratedOutput> {
		self(primary_text)
	}
}

/// Receives generation results. Implemented by [`DocumentPair`].
pub trait GenerationSink: Send + Sync {
	/// The primary text snapshot generation should run against.
	fn primary_text(&self) -> Rope;

	/// Installs a complete generation result.
	fn on_generated(&self, output: GeneratedOutput) -> Result<ApplyOutcome>;
}

/// Registration handle returned by [`GenerationService::advise`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdviseCookie(pub u64);

/// The generation service as seen by a document pair.
pub trait GenerationService: Send + Sync {
	/// Registers a sink for generation results.
	fn advise(&self, sink: Weak<dyn GenerationSink>) -> AdviseCookie;

	/// Removes a previously advised sink. Unknown cookies are ignored.
	fn unadvise(&self, cookie: AdviseCookie);

	/// Signals that the primary text of the advised sinks changed.
	///
	/// Implementations may regenerate synchronously, calling back into
	/// [`GenerationSink::on_generated`] before returning.
	fn primary_text_changed(&self, changed: bool) -> Result<()>;

	/// Signals that a trigger character was typed in a view.
	fn char_typed(&self, view: ViewId, ch: char) -> Result<()>;
}

/// Creates the generation service for each new document pair.
pub trait LanguageSupervisor: Send + Sync {
	fn on_source_associated(&self, source: &Arc<DocumentPair>) -> Result<Arc<dyn GenerationService>>;
}

/// Runs a [`Generator`] synchronously for every advised sink.
pub struct SourceSupervisor {
	generator: Arc<dyn Generator>,
	sinks: Mutex<FxHashMap<AdviseCookie, Weak<dyn GenerationSink>>>,
	last_cookie: AtomicU64,
}

impl SourceSupervisor {
	pub fn new(generator: Arc<dyn Generator>) -> Self {
		Self {
			generator,
			sinks: Mutex::new(FxHashMap::default()),
			last_cookie: AtomicU64::new(0),
		}
	}

	/// Number of advised sinks that are still alive.
	pub fn sink_count(&self) -> usize {
		self.sinks
			.lock()
			.values()
			.filter(|s| s.strong_count() > 0)
			.count()
	}

	/// Upgrades live sinks and forgets dead ones.
	fn live_sinks(&self) -> Vec<Arc<dyn GenerationSink>> {
		let mut sinks = self.sinks.lock();
		sinks.retain(|_, s| s.strong_count() > 0);
		sinks.values().filter_map(Weak::upgrade).collect()
	}
}

impl GenerationService for SourceSupervisor {
	fn advise(&self, sink: Weak<dyn GenerationSink>) -> AdviseCookie {
		let cookie = AdviseCookie(self.last_cookie.fetch_add(1, Ordering::Relaxed) + 1);
		self.sinks.lock().insert(cookie, sink);
		trace!(cookie = cookie.0, "Sink advised");
		cookie
	}

	fn unadvise(&self, cookie: AdviseCookie) {
		if self.sinks.lock().remove(&cookie).is_some() {
			trace!(cookie = cookie.0, "Sink unadvised");
		}
	}

	fn primary_text_changed(&self, changed: bool) -> Result<()> {
		if !changed {
			return Ok(());
		}
		// Sinks call back into their own state; the sink map must not be held.
		for sink in self.live_sinks() {
			let primary = sink.primary_text().to_string();
			let output = self.generator.generate(&primary).inspect_err(|e| {
				warn!(error = %e, "Generation failed");
			})?;
			debug!(
				primary_chars = primary.chars().count(),
				secondary_chars = output.secondary_text.chars().count(),
				mappings = output.correspondences.len(),
				paints = output.paints.len(),
				"Generated secondary text"
			);
			sink.on_generated(output)?;
		}
		Ok(())
	}

	fn char_typed(&self, view: ViewId, ch: char) -> Result<()> {
		trace!(%view, ?ch, "Trigger character typed");
		Ok(())
	}
}

impl fmt::Debug for SourceSupervisor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SourceSupervisor")
			.field("sinks", &self.sinks.lock().len())
			.finish_non_exhaustive()
	}
}

/// Gives every document pair its own [`SourceSupervisor`] over a shared generator.
#[derive(Clone)]
pub struct SupervisorFactory {
	generator: Arc<dyn Generator>,
}

impl SupervisorFactory {
	pub fn new(generator: Arc<dyn Generator>) -> Self {
		Self { generator }
	}
}

impl LanguageSupervisor for SupervisorFactory {
	fn on_source_associated(&self, source: &Arc<DocumentPair>) -> Result<Arc<dyn GenerationService>> {
		debug!(primary = %source.id(), "Creating source supervisor");
		Ok(Arc::new(SourceSupervisor::new(self.generator.clone())))
	}
}

impl fmt::Debug for SupervisorFactory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SupervisorFactory").finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Error;

	#[derive(Default)]
	struct RecordingSink {
		text: Mutex<String>,
		received: Mutex<Vec<GeneratedOutput>>,
	}

	impl GenerationSink for RecordingSink {
		fn primary_text(&self) -> Rope {
			Rope::from_str(&self.text.lock())
		}

		fn on_generated(&self, output: GeneratedOutput) -> Result<ApplyOutcome> {
			self.received.lock().push(output);
			Ok(ApplyOutcome::Applied)
		}
	}

	fn upper_generator() -> Arc<dyn Generator> {
		Arc::new(|text: &str| -> Result<GeneratedOutput> {
			Ok(GeneratedOutput {
				secondary_text: text.to_uppercase(),
				..GeneratedOutput::default()
			})
		})
	}

	#[test]
	fn cookies_increase() {
		let supervisor = SourceSupervisor::new(upper_generator());
		let sink: Arc<dyn GenerationSink> = Arc::new(RecordingSink::default());
		let a = supervisor.advise(Arc::downgrade(&sink));
		let b = supervisor.advise(Arc::downgrade(&sink));
		assert_eq!(a, AdviseCookie(1));
		assert_eq!(b, AdviseCookie(2));
		assert_eq!(supervisor.sink_count(), 2);
	}

	#[test]
	fn delivers_to_advised_sinks_only() {
		let supervisor = SourceSupervisor::new(upper_generator());
		let sink = Arc::new(RecordingSink::default());
		*sink.text.lock() = "abc".to_string();
		let dyn_sink: Arc<dyn GenerationSink> = sink.clone();
		let cookie = supervisor.advise(Arc::downgrade(&dyn_sink));

		supervisor.primary_text_changed(true).unwrap();
		assert_eq!(sink.received.lock().len(), 1);
		assert_eq!(sink.received.lock()[0].secondary_text, "ABC");

		supervisor.unadvise(cookie);
		supervisor.primary_text_changed(true).unwrap();
		assert_eq!(sink.received.lock().len(), 1);
	}

	#[test]
	fn unchanged_signal_is_ignored() {
		let supervisor = SourceSupervisor::new(upper_generator());
		let sink = Arc::new(RecordingSink::default());
		let dyn_sink: Arc<dyn GenerationSink> = sink.clone();
		supervisor.advise(Arc::downgrade(&dyn_sink));
		supervisor.primary_text_changed(false).unwrap();
		assert!(sink.received.lock().is_empty());
	}

	#[test]
	fn dead_sinks_are_pruned() {
		let supervisor = SourceSupervisor::new(upper_generator());
		let sink: Arc<dyn GenerationSink> = Arc::new(RecordingSink::default());
		supervisor.advise(Arc::downgrade(&sink));
		drop(sink);
		assert_eq!(supervisor.sink_count(), 0);
		supervisor.primary_text_changed(true).unwrap();
		assert!(supervisor.sinks.lock().is_empty());
	}

	#[test]
	fn generator_failure_propagates() {
		let supervisor = SourceSupervisor::new(Arc::new(|_: &str| -> Result<GeneratedOutput> {
			Err(Error::Generation("unbalanced tag".into()))
		}));
		let sink = Arc::new(RecordingSink::default());
		let dyn_sink: Arc<dyn GenerationSink> = sink.clone();
		supervisor.advise(Arc::downgrade(&dyn_sink));
		let err = supervisor.primary_text_changed(true).unwrap_err();
		assert!(matches!(err, Error::Generation(_)));
		assert!(sink.received.lock().is_empty());
	}
}
