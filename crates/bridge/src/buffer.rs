//! In-memory rope buffers.
//!
//! Hosts with their own storage implement [`TextBuffer`] directly; these are
//! used for secondary documents when the host has no allocator of its own,
//! and throughout the tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tandem_primitives::Rope;
use tracing::trace;

use crate::Result;
use crate::host::{BufferAllocator, BufferId, TextBuffer};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// A thread-safe buffer backed by a [`Rope`].
#[derive(Debug)]
pub struct RopeBuffer {
	id: BufferId,
	language: Option<String>,
	text: RwLock<Rope>,
	/// Incremented on each edit.
	version: AtomicU64,
}

impl RopeBuffer {
	pub fn new(text: &str) -> Self {
		Self {
			id: BufferId(NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed)),
			language: None,
			text: RwLock::new(Rope::from_str(text)),
			version: AtomicU64::new(0),
		}
	}

	/// Creates an empty buffer tagged with the language that owns it.
	pub fn for_language(language: &str) -> Self {
		Self {
			language: Some(language.to_string()),
			..Self::new("")
		}
	}

	pub fn language(&self) -> Option<&str> {
		self.language.as_deref()
	}

	/// Number of edits applied since creation.
	pub fn version(&self) -> u64 {
		self.version.load(Ordering::Relaxed)
	}

	/// Inserts `text` at char offset `at`, clamped to the end of the buffer.
	pub fn insert(&self, at: usize, text: &str) {
		let mut rope = self.text.write();
		let at = at.min(rope.len_chars());
		rope.insert(at, text);
		self.version.fetch_add(1, Ordering::Relaxed);
	}

	/// Removes the chars in `start..end`, clamped to the buffer.
	pub fn remove(&self, start: usize, end: usize) {
		let mut rope = self.text.write();
		let end = end.min(rope.len_chars());
		let start = start.min(end);
		rope.remove(start..end);
		self.version.fetch_add(1, Ordering::Relaxed);
	}
}

impl TextBuffer for RopeBuffer {
	fn id(&self) -> BufferId {
		self.id
	}

	fn snapshot(&self) -> Rope {
		self.text.read().clone()
	}

	fn replace_all(&self, text: &str) -> Result<()> {
		*self.text.write() = Rope::from_str(text);
		let version = self.version.fetch_add(1, Ordering::Relaxed) + 1;
		trace!(buffer = %self.id, version, chars = text.chars().count(), "Buffer replaced");
		Ok(())
	}
}

/// Allocates [`RopeBuffer`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct RopeBufferAllocator;

impl BufferAllocator for RopeBufferAllocator {
	fn create(&self, language: &str) -> Result<Arc<dyn TextBuffer>> {
		Ok(Arc::new(RopeBuffer::for_language(language)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ids_are_unique() {
		let a = RopeBuffer::new("");
		let b = RopeBuffer::new("");
		assert_ne!(a.id(), b.id());
	}

	#[test]
	fn replace_all_swaps_contents() {
		let buf = RopeBuffer::new("old text");
		buf.replace_all("new").unwrap();
		assert_eq!(buf.snapshot().to_string(), "new");
		assert_eq!(buf.version(), 1);
	}

	#[test]
	fn snapshot_is_detached_from_later_edits() {
		let buf = RopeBuffer::new("abc");
		let before = buf.snapshot();
		buf.insert(3, "def");
		assert_eq!(before.to_string(), "abc");
		assert_eq!(buf.snapshot().to_string(), "abcdef");
	}

	#[test]
	fn edits_clamp_to_bounds() {
		let buf = RopeBuffer::new("abc");
		buf.insert(99, "!");
		buf.remove(1, 99);
		assert_eq!(buf.snapshot().to_string(), "a");
		assert_eq!(buf.version(), 2);
	}

	#[test]
	fn allocator_tags_language() {
		let buf = RopeBuffer::for_language("csharp");
		assert_eq!(buf.language(), Some("csharp"));
		assert_eq!(buf.snapshot().len_chars(), 0);
		assert!(RopeBufferAllocator.create("csharp").is_ok());
	}
}
