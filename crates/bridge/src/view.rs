//! Per-view command bridge.
//!
//! A [`ViewBridge`] sits at the head of a view's command chain. Commands
//! pass through it to the contained language's view filter (or straight to
//! the previous head when there is no filter). Typing a trigger character
//! also notifies the pair's generation service.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tandem_primitives::{LineCol, TextSpan};
use tracing::{debug, trace, warn};

use crate::coordinator::IntellisenseHost;
use crate::host::{
	Command, CommandStatus, CommandTarget, DataTip, TextView, ViewFilter, ViewId, WordExtentFlags,
};
use crate::registry::DocumentRegistry;
use crate::settings::Triggers;
use crate::source::DocumentPair;
use crate::Result;

#[derive(Default)]
struct Chain {
	/// The command target that was at the head before this bridge.
	next: Option<Arc<dyn CommandTarget>>,
	/// The contained language's filter for this view.
	filter: Option<Arc<dyn ViewFilter>>,
}

/// Binds one editor view to its document pair.
///
/// Holds the pair weakly; the registry owns it. Call [`ViewBridge::close`]
/// when the view goes away.
pub struct ViewBridge {
	id: ViewId,
	view: Weak<dyn TextView>,
	pair: Weak<DocumentPair>,
	registry: Arc<DocumentRegistry>,
	host: IntellisenseHost,
	triggers: Triggers,
	chain: RwLock<Chain>,
	closed: AtomicBool,
}

impl ViewBridge {
	/// Opens a bridge for `view` and wedges it into the view's command chain.
	///
	/// On failure the partially built bridge is closed again and the cause
	/// is reported as [`crate::Error::Initialization`].
	pub fn open(registry: Arc<DocumentRegistry>, view: Arc<dyn TextView>) -> Result<Arc<Self>> {
		let id = view.id();
		let pair = registry.attach_view(&view.buffer(), id)?;
		let bridge = Arc::new(Self {
			id,
			view: Arc::downgrade(&view),
			pair: Arc::downgrade(&pair),
			host: IntellisenseHost::new(pair.coordinator().clone()),
			triggers: registry.settings().triggers.clone(),
			registry,
			chain: RwLock::new(Chain::default()),
			closed: AtomicBool::new(false),
		});

		if let Err(e) = bridge.connect(&view, &pair) {
			warn!(%id, primary = %pair.id(), error = %e, "View bridge setup failed");
			bridge.close();
			return Err(e.into_initialization());
		}
		debug!(%id, primary = %pair.id(), "View bridge opened");
		Ok(bridge)
	}

	fn connect(self: &Arc<Self>, view: &Arc<dyn TextView>, pair: &Arc<DocumentPair>) -> Result<()> {
		let target: Arc<dyn CommandTarget> = self.clone();
		let next = view.add_command_filter(target)?;
		self.chain.write().next = next.clone();

		let filter = pair
			.contained()
			.text_view_filter(self.host.clone(), next)?;
		if let Some(filter) = &filter {
			pair.register_view_filter(self.id, filter.clone());
		} else {
			trace!(view = %self.id, "Contained language has no view filter yet");
		}
		self.chain.write().filter = filter;

		pair.contained().on_editor_ready()
	}

	pub fn id(&self) -> ViewId {
		self.id
	}

	/// The pair this view was opened against, while it is still registered.
	pub fn pair(&self) -> Option<Arc<DocumentPair>> {
		self.pair.upgrade()
	}

	pub fn host(&self) -> &IntellisenseHost {
		&self.host
	}

	pub fn has_filter(&self) -> bool {
		self.chain.read().filter.is_some()
	}

	fn filter(&self) -> Option<Arc<dyn ViewFilter>> {
		self.chain.read().filter.clone()
	}

	/// Extent of the word at `at`, as reported by the contained language.
	pub fn word_extent(&self, at: LineCol, flags: WordExtentFlags) -> Option<TextSpan> {
		self.filter()?.word_extent(at, flags)
	}

	pub fn data_tip_text(&self, span: TextSpan) -> Option<DataTip> {
		self.filter()?.data_tip_text(span)
	}

	pub fn pair_extents(&self, at: LineCol) -> Option<(TextSpan, TextSpan)> {
		self.filter()?.pair_extents(at)
	}

	/// Where commands go next: the contained filter, else the previous head.
	fn downstream(&self) -> Option<Arc<dyn CommandTarget>> {
		let chain = self.chain.read();
		match &chain.filter {
			Some(filter) => Some(filter.clone() as Arc<dyn CommandTarget>),
			None => chain.next.clone(),
		}
	}

	fn notify_char_typed(&self, ch: char) {
		let Some(service) = self.pair().and_then(|p| p.generation_service()) else {
			return;
		};
		trace!(view = %self.id, ?ch, "Forwarding trigger character");
		if let Err(e) = service.char_typed(self.id, ch) {
			warn!(view = %self.id, ?ch, error = %e, "Trigger notification failed");
		}
	}

	/// Leaves the command chain and detaches from the pair.
	///
	/// The pair is released from the registry when this was its last view.
	/// Closing twice is a no-op.
	pub fn close(self: &Arc<Self>) {
		if self.closed.swap(true, Ordering::SeqCst) {
			return;
		}
		if let Some(view) = self.view.upgrade() {
			let target: Arc<dyn CommandTarget> = self.clone();
			view.remove_command_filter(&target);
		}
		*self.chain.write() = Chain::default();
		if let Some(pair) = self.pair.upgrade() {
			self.registry.detach_view(&pair, self.id);
		}
		debug!(view = %self.id, "View bridge closed");
	}
}

impl CommandTarget for ViewBridge {
	fn query_status(&self, command: &Command) -> CommandStatus {
		match self.downstream() {
			Some(target) => target.query_status(command),
			None => CommandStatus::Unsupported,
		}
	}

	fn exec(&self, command: &Command) -> Result<()> {
		if let Command::TypeChar(ch) = command
			&& self.triggers.contains(*ch)
		{
			self.notify_char_typed(*ch);
		}

		match self.downstream() {
			Some(target) => target.exec(command),
			None => Ok(()),
		}
	}
}

impl fmt::Debug for ViewBridge {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ViewBridge")
			.field("id", &self.id)
			.field("filter", &self.has_filter())
			.field("closed", &self.closed.load(Ordering::Relaxed))
			.finish_non_exhaustive()
	}
}
