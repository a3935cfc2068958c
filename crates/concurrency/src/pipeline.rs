//! Pipeline batching
//!
//! A [`PipelineBatch`] collects path writes instead of sending them one by
//! one: inside a pipeline scope every proxy write is staged here, and on
//! clean scope exit the batch is flushed as one atomic multi-path commit per
//! document via [`DocumentStore::write_multi`]. On error the batch is
//! discarded and nothing is sent.
//!
//! The batch is an ordered mapping from `(document key, path)` to the pending
//! wire value: staging the same path again replaces the pending value in
//! place, keeping the position of the first staging. A batch is scoped to one
//! logical operation and must not be shared across concurrent tasks.

use docbind_core::{DocPath, Result};
use docbind_store::{DocumentStore, WireValue};
use tracing::{debug, trace};

struct PendingWrite {
    key: String,
    path: DocPath,
    value: WireValue,
}

/// Ordered set of pending path writes for one pipeline scope
#[derive(Default)]
pub struct PipelineBatch {
    writes: Vec<PendingWrite>,
}

impl PipelineBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a write of `value` at `path` of document `key`
    ///
    /// A later staging of the same `(key, path)` replaces the pending value
    /// in place.
    pub fn stage(&mut self, key: &str, path: DocPath, value: WireValue) {
        match self
            .writes
            .iter_mut()
            .find(|w| w.key == key && w.path == path)
        {
            Some(existing) => existing.value = value,
            None => self.writes.push(PendingWrite {
                key: key.to_string(),
                path,
                value,
            }),
        }
    }

    /// Number of pending writes
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    /// Whether nothing is staged
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// The pending value staged at `(key, path)`, if any
    pub fn staged_value(&self, key: &str, path: &DocPath) -> Option<&WireValue> {
        self.writes
            .iter()
            .find(|w| w.key == key && w.path == *path)
            .map(|w| &w.value)
    }

    /// Document keys with pending writes, in first-staged order
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for write in &self.writes {
            if !keys.contains(&write.key.as_str()) {
                keys.push(&write.key);
            }
        }
        keys
    }

    /// Submit every pending write, one atomic multi-path commit per document
    ///
    /// Writes within a document apply in submission order. The batch is
    /// consumed either way; callers drop it on error paths via [`discard`].
    ///
    /// [`discard`]: PipelineBatch::discard
    pub fn flush(self, store: &dyn DocumentStore) -> Result<()> {
        if self.writes.is_empty() {
            return Ok(());
        }
        debug!(writes = self.writes.len(), "flushing pipeline batch");
        let mut groups: Vec<(String, Vec<(DocPath, WireValue)>)> = Vec::new();
        for write in self.writes {
            match groups.iter_mut().find(|(key, _)| *key == write.key) {
                Some((_, writes)) => writes.push((write.path, write.value)),
                None => groups.push((write.key, vec![(write.path, write.value)])),
            }
        }
        for (key, writes) in groups {
            store.write_multi(&key, writes)?;
        }
        Ok(())
    }

    /// Drop the batch without sending anything
    pub fn discard(self) {
        if !self.writes.is_empty() {
            trace!(writes = self.writes.len(), "discarding pipeline batch");
        }
    }
}
