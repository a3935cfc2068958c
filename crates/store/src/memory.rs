//! In-memory document store
//!
//! [`MemoryStore`] is the in-process reference implementation of
//! [`DocumentStore`]: documents live in a sharded `DashMap`, and every
//! per-document operation runs under its shard lock, which is what makes
//! `eval`, `write_multi`, the array primitives, and `set_if_not_exists`
//! atomic with respect to each other.
//!
//! TTLs are enforced lazily: an expired document is treated as absent (and
//! dropped) the moment any operation touches it. [`MemoryStore::purge_expired`]
//! additionally sweeps via an [`ExpiryIndex`], touching only O(expired)
//! entries.

use crate::script::{reply_found, reply_not_found, EvalScript};
use crate::traits::{DocumentStore, WireValue};
use crate::ttl::ExpiryIndex;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use docbind_core::path::{delete_at, get_at, get_at_mut, set_at, PathError};
use docbind_core::{DocPath, Error, Result};
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

struct StoredDoc {
    value: WireValue,
    expires_at: Option<Instant>,
}

impl StoredDoc {
    fn empty() -> Self {
        StoredDoc {
            value: WireValue::Object(serde_json::Map::new()),
            expires_at: None,
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |t| t <= Instant::now())
    }
}

fn path_error(e: PathError) -> Error {
    Error::Store(e.to_string())
}

/// In-memory reference implementation of [`DocumentStore`]
#[derive(Default)]
pub struct MemoryStore {
    docs: DashMap<String, StoredDoc>,
    expiry: Mutex<ExpiryIndex>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Sweep expired documents, returning how many were dropped
    ///
    /// Lazy expiry already hides expired documents from every operation;
    /// the sweep reclaims their memory.
    pub fn purge_expired(&self) -> usize {
        let expired_keys = self.expiry.lock().take_expired(Instant::now());
        let mut dropped = 0;
        for key in expired_keys {
            if self.docs.remove_if(&key, |_, doc| doc.is_expired()).is_some() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!(dropped, "purged expired documents");
        }
        dropped
    }

    /// Number of live documents (expired ones excluded)
    pub fn len(&self) -> usize {
        self.docs.iter().filter(|doc| !doc.is_expired()).count()
    }

    /// Whether the store holds no live documents
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `f` against a live document, lazily dropping an expired one
    fn read_doc<R>(&self, key: &str, f: impl FnOnce(&WireValue) -> R) -> Option<R> {
        {
            let doc = self.docs.get(key)?;
            if !doc.is_expired() {
                return Some(f(&doc.value));
            }
        }
        self.docs.remove_if(key, |_, doc| doc.is_expired());
        None
    }

    /// Run `f` against a live document mutably, lazily dropping an expired one
    fn mutate_doc<R>(&self, key: &str, f: impl FnOnce(&mut WireValue) -> R) -> Option<R> {
        {
            let mut doc = self.docs.get_mut(key)?;
            if !doc.is_expired() {
                return Some(f(&mut doc.value));
            }
        }
        self.docs.remove_if(key, |_, doc| doc.is_expired());
        None
    }

    /// Run `f` against the document, creating an empty root object first if
    /// the document is absent or expired
    fn upsert_doc<R>(&self, key: &str, f: impl FnOnce(&mut StoredDoc) -> R) -> R {
        let mut doc = self
            .docs
            .entry(key.to_string())
            .or_insert_with(StoredDoc::empty);
        if doc.is_expired() {
            if let Some(deadline) = doc.expires_at {
                self.expiry.lock().remove(deadline, key);
            }
            *doc = StoredDoc::empty();
        }
        f(&mut doc)
    }

    /// Make sure an array exists at `path`, creating it (and intermediates)
    fn ensure_array(doc: &mut WireValue, path: &DocPath) -> Result<()> {
        match get_at(doc, path) {
            Some(WireValue::Array(_)) => Ok(()),
            Some(other) => Err(Error::Store(format!(
                "expected array at '{}', found {}",
                path,
                docbind_core::path::json_type_name(other)
            ))),
            None => set_at(doc, path, WireValue::Array(Vec::new())).map_err(path_error),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, key: &str, path: &DocPath) -> Result<Option<WireValue>> {
        Ok(self
            .read_doc(key, |doc| get_at(doc, path).cloned())
            .flatten())
    }

    fn set(&self, key: &str, path: &DocPath, value: WireValue) -> Result<()> {
        trace!(key, path = %path, "set");
        self.upsert_doc(key, |doc| {
            if path.is_root() {
                doc.value = value;
                Ok(())
            } else {
                set_at(&mut doc.value, path, value).map_err(path_error)
            }
        })
    }

    fn delete_path(&self, key: &str, path: &DocPath) -> Result<bool> {
        if path.is_root() {
            return self.delete_doc(key);
        }
        match self.mutate_doc(key, |doc| delete_at(doc, path).map_err(path_error)) {
            None => Ok(false),
            Some(result) => Ok(result?.is_some()),
        }
    }

    fn array_append(&self, key: &str, path: &DocPath, values: Vec<WireValue>) -> Result<usize> {
        self.upsert_doc(key, |doc| {
            Self::ensure_array(&mut doc.value, path)?;
            let arr = get_at_mut(&mut doc.value, path)
                .and_then(WireValue::as_array_mut)
                .ok_or_else(|| Error::Store(format!("no array at '{}'", path)))?;
            arr.extend(values);
            Ok(arr.len())
        })
    }

    fn array_insert(
        &self,
        key: &str,
        path: &DocPath,
        index: usize,
        value: WireValue,
    ) -> Result<()> {
        self.upsert_doc(key, |doc| {
            Self::ensure_array(&mut doc.value, path)?;
            let arr = get_at_mut(&mut doc.value, path)
                .and_then(WireValue::as_array_mut)
                .ok_or_else(|| Error::Store(format!("no array at '{}'", path)))?;
            if index > arr.len() {
                return Err(Error::Store(format!(
                    "insert index {} out of bounds for length {}",
                    index,
                    arr.len()
                )));
            }
            arr.insert(index, value);
            Ok(())
        })
    }

    fn array_pop(&self, key: &str, path: &DocPath, index: i64) -> Result<Option<WireValue>> {
        let popped = self.mutate_doc(key, |doc| {
            let arr = match get_at_mut(doc, path).and_then(WireValue::as_array_mut) {
                Some(arr) => arr,
                None => return None,
            };
            let len = arr.len() as i64;
            let resolved = if index < 0 { len + index } else { index };
            if resolved < 0 || resolved >= len {
                return None;
            }
            Some(arr.remove(resolved as usize))
        });
        Ok(popped.flatten())
    }

    fn object_keys(&self, key: &str, path: &DocPath) -> Result<Option<WireValue>> {
        Ok(self
            .read_doc(key, |doc| {
                get_at(doc, path).and_then(|value| value.as_object()).map(|obj| {
                    WireValue::Array(
                        obj.keys()
                            .map(|k| WireValue::String(k.clone()))
                            .collect(),
                    )
                })
            })
            .flatten())
    }

    fn eval(&self, script: &EvalScript, key: &str) -> Result<WireValue> {
        match script {
            EvalScript::PopKey { path, key: entry } => {
                let reply = self.mutate_doc(key, |doc| {
                    let obj = get_at_mut(doc, path).and_then(WireValue::as_object_mut);
                    match obj.and_then(|obj| obj.remove(entry)) {
                        Some(removed) => reply_found(&removed),
                        None => reply_not_found(),
                    }
                });
                Ok(reply.unwrap_or_else(reply_not_found))
            }
        }
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.read_doc(key, |_| ()).is_some())
    }

    fn delete_doc(&self, key: &str) -> Result<bool> {
        match self.docs.remove(key) {
            None => Ok(false),
            Some((_, doc)) => {
                if let Some(deadline) = doc.expires_at {
                    self.expiry.lock().remove(deadline, key);
                }
                debug!(key, "document deleted");
                Ok(!doc.is_expired())
            }
        }
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let deadline = Instant::now() + ttl;
        let updated = {
            let mut doc = match self.docs.get_mut(key) {
                Some(doc) => doc,
                None => return Ok(false),
            };
            if doc.is_expired() {
                false
            } else {
                if let Some(old) = doc.expires_at {
                    self.expiry.lock().remove(old, key);
                }
                doc.expires_at = Some(deadline);
                true
            }
        };
        if updated {
            self.expiry.lock().insert(deadline, key);
        } else {
            self.docs.remove_if(key, |_, doc| doc.is_expired());
        }
        Ok(updated)
    }

    fn set_if_not_exists(
        &self,
        key: &str,
        value: WireValue,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        let deadline = ttl.map(|ttl| Instant::now() + ttl);
        let doc = StoredDoc {
            value,
            expires_at: deadline,
        };
        let claimed = match self.docs.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired() {
                    if let Some(old) = occupied.get().expires_at {
                        self.expiry.lock().remove(old, key);
                    }
                    occupied.insert(doc);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(doc);
                true
            }
        };
        if claimed {
            if let Some(deadline) = deadline {
                self.expiry.lock().insert(deadline, key);
            }
        }
        Ok(claimed)
    }

    fn write_multi(&self, key: &str, writes: Vec<(DocPath, WireValue)>) -> Result<()> {
        trace!(key, count = writes.len(), "write_multi");
        self.upsert_doc(key, |doc| {
            // Stage against a copy so a failing write leaves nothing applied
            let mut staged = doc.value.clone();
            for (path, value) in writes {
                if path.is_root() {
                    staged = value;
                } else {
                    set_at(&mut staged, &path, value).map_err(path_error)?;
                }
            }
            doc.value = staged;
            Ok(())
        })
    }
}
