//! Expiry index for efficient TTL cleanup
//!
//! Maps expiry deadline → set of document keys using a BTreeMap for sorted
//! order, so a sweep touches O(expired count) entries instead of scanning
//! every live document.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

/// Expiry index: deadline → document keys
#[derive(Debug, Default)]
pub struct ExpiryIndex {
    index: BTreeMap<Instant, HashSet<String>>,
}

impl ExpiryIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `key` as expiring at `deadline`
    pub fn insert(&mut self, deadline: Instant, key: impl Into<String>) {
        self.index.entry(deadline).or_default().insert(key.into());
    }

    /// Stop tracking `key` at `deadline` (key deleted or TTL replaced)
    pub fn remove(&mut self, deadline: Instant, key: &str) {
        if let Some(keys) = self.index.get_mut(&deadline) {
            keys.remove(key);
            if keys.is_empty() {
                self.index.remove(&deadline);
            }
        }
    }

    /// Drain and return all keys whose deadline is at or before `now`
    pub fn take_expired(&mut self, now: Instant) -> Vec<String> {
        let expired_deadlines: Vec<Instant> =
            self.index.range(..=now).map(|(t, _)| *t).collect();
        let mut keys = Vec::new();
        for deadline in expired_deadlines {
            if let Some(set) = self.index.remove(&deadline) {
                keys.extend(set);
            }
        }
        keys
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.index.values().map(HashSet::len).sum()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
