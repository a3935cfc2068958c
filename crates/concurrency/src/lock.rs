//! Distributed mutual-exclusion lock
//!
//! A [`Lock`] is a time-limited, token-based marker over a resource key:
//! acquisition atomically creates `{resource_key}:lock` with a random token
//! and a TTL via the store's set-if-not-exists primitive, polling with a
//! fixed sleep until it wins. There is no retry bound — the holder's TTL is
//! what eventually frees a dead holder's marker.
//!
//! Mutual exclusion holds among cooperating callers only; writers that skip
//! the lock are not excluded.
//!
//! # Known race on release
//!
//! `release` deletes the marker without re-checking that the stored token is
//! still its own. A holder that outlives its TTL can therefore delete a
//! marker that a later holder has since acquired, letting a third contender
//! in early. Deliberately left intact as an open correctness question; a
//! fencing fix (compare-token delete) must not land without settling the
//! intended semantics first.

use docbind_core::{Error, Result};
use docbind_store::DocumentStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{trace, warn};
use uuid::Uuid;

/// Suffix appended to the resource key to form the marker key
const LOCK_SUFFIX: &str = ":lock";

/// A held distributed lock; the marker is deleted on `release` or drop
pub struct Lock {
    store: Arc<dyn DocumentStore>,
    resource_key: String,
    token: String,
    ttl: Duration,
    released: bool,
}

impl Lock {
    /// Acquire the lock on `resource_key`, polling until it succeeds
    ///
    /// Each attempt is one atomic set-if-not-exists; a lost attempt sleeps
    /// `poll_interval` and tries again, without bound. Callers needing
    /// cancellation wrap this in their host environment's mechanism.
    pub fn acquire(
        store: Arc<dyn DocumentStore>,
        resource_key: impl Into<String>,
        ttl: Duration,
        poll_interval: Duration,
    ) -> Result<Lock> {
        let resource_key = resource_key.into();
        loop {
            if let Some(lock) = Self::try_acquire(store.clone(), resource_key.clone(), ttl)? {
                return Ok(lock);
            }
            trace!(resource = %resource_key, "lock contended, polling");
            std::thread::sleep(poll_interval);
        }
    }

    /// One acquisition attempt; `Ok(None)` when another holder has the marker
    pub fn try_acquire(
        store: Arc<dyn DocumentStore>,
        resource_key: impl Into<String>,
        ttl: Duration,
    ) -> Result<Option<Lock>> {
        let resource_key = resource_key.into();
        let token = Uuid::new_v4().to_string();
        let marker = format!("{}{}", resource_key, LOCK_SUFFIX);
        let claimed = store.set_if_not_exists(
            &marker,
            serde_json::Value::String(token.clone()),
            Some(ttl),
        )?;
        if claimed {
            Ok(Some(Lock {
                store,
                resource_key,
                token,
                ttl,
                released: false,
            }))
        } else {
            Ok(None)
        }
    }

    /// The locked resource key
    pub fn resource_key(&self) -> &str {
        &self.resource_key
    }

    /// The random token stored in the marker
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The TTL the marker was created with
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The marker key in the store
    pub fn marker_key(&self) -> String {
        format!("{}{}", self.resource_key, LOCK_SUFFIX)
    }

    /// Release the lock by deleting the marker
    ///
    /// No ownership re-check happens first — see the module docs for the
    /// race this implies once the TTL has lapsed.
    pub fn release(mut self) -> Result<()> {
        self.delete_marker()
    }

    fn delete_marker(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.store
            .delete_doc(&self.marker_key())
            .map(|_| ())
            .map_err(|e| Error::Store(format!("lock release failed: {}", e)))
    }
}

impl Drop for Lock {
    fn drop(&mut self) {
        if !self.released {
            if let Err(e) = self.delete_marker() {
                warn!(resource = %self.resource_key, error = %e, "failed to release lock on drop");
            }
        }
    }
}
