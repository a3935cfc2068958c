//! Store context and record handle
//!
//! [`StoreContext`] is the `{store_handle, default_ttl}` pair the external
//! configuration layer hands in per record type. [`RecordHandle`] is the
//! shared state every proxy of one record points at: the store handle and the
//! record's current key. Proxies hold an `Arc<RecordHandle>` and resolve the
//! key at call time — reassigning the key re-targets all of them at once, and
//! nothing here points back at the record, so no reference cycle can form.

use docbind_core::{RecordKey, Result};
use docbind_store::DocumentStore;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Per-type store configuration: a store handle plus an optional default TTL
#[derive(Clone)]
pub struct StoreContext {
    store: Arc<dyn DocumentStore>,
    default_ttl: Option<Duration>,
}

impl StoreContext {
    /// Create a context over a store handle, without a TTL
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            default_ttl: None,
        }
    }

    /// Attach a default TTL reapplied after every save
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// The store handle
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// The configured default TTL
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }
}

/// Shared per-record state: store handle + current key + TTL
pub struct RecordHandle {
    store: Arc<dyn DocumentStore>,
    key: RwLock<RecordKey>,
    default_ttl: Option<Duration>,
}

impl RecordHandle {
    /// Create a handle for `key` under `ctx`
    pub fn new(ctx: &StoreContext, key: RecordKey) -> Arc<Self> {
        Arc::new(Self {
            store: ctx.store.clone(),
            key: RwLock::new(key),
            default_ttl: ctx.default_ttl,
        })
    }

    /// A sibling handle with the same store and TTL but a different key
    pub fn with_key(&self, key: RecordKey) -> Arc<Self> {
        Arc::new(Self {
            store: self.store.clone(),
            key: RwLock::new(key),
            default_ttl: self.default_ttl,
        })
    }

    /// The store handle
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// The record's current key
    pub fn key(&self) -> RecordKey {
        self.key.read().clone()
    }

    /// The external key string used against the store
    pub fn external_key(&self) -> String {
        self.key.read().external()
    }

    /// Replace the key, re-targeting every proxy holding this handle
    pub fn set_key(&self, key: RecordKey) {
        *self.key.write() = key;
    }

    /// The configured default TTL
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Reapply the default TTL to the document, if one is configured
    ///
    /// A missing document is not an error here; `expire` just reports false.
    pub fn reapply_ttl(&self) -> Result<()> {
        if let Some(ttl) = self.default_ttl {
            self.store.expire(&self.external_key(), ttl)?;
        }
        Ok(())
    }
}
