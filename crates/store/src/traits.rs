//! Remote document-store command surface
//!
//! [`DocumentStore`] is the boundary this core consumes: a keyed JSON
//! document store with sub-path addressing, list/object mutation primitives,
//! atomic server-side scripts, whole-document lifecycle, and the
//! set-if-not-exists lock primitive. Everything behind the trait — wire
//! protocol, transport, connection pooling — is out of scope.
//!
//! # Thread Safety
//!
//! Implementations must be `Send + Sync`; one store handle is shared by every
//! record bound to it.
//!
//! # Semantics required of implementations
//!
//! - `get` on a missing document or missing sub-path returns `Ok(None)`;
//!   callers use `exists` to tell the two apart.
//! - `set` upserts: it creates the document and intermediate containers as
//!   needed and never touches sibling paths.
//! - `array_append` appends the whole batch in one atomic call.
//! - `eval` runs the script atomically with respect to every other command
//!   on the same document.
//! - `write_multi` applies all path writes as one atomic unit, in order;
//!   either every write is visible or none is.
//! - `set_if_not_exists` atomically claims a missing (or expired) document.

use crate::script::EvalScript;
use docbind_core::{DocPath, Result};
use std::time::Duration;

/// Wire value exchanged with the remote store
pub type WireValue = serde_json::Value;

/// The remote document store command surface
pub trait DocumentStore: Send + Sync {
    /// Read the sub-document at `path`
    fn get(&self, key: &str, path: &DocPath) -> Result<Option<WireValue>>;

    /// Write the sub-document at `path`
    fn set(&self, key: &str, path: &DocPath, value: WireValue) -> Result<()>;

    /// Remove the sub-document at `path`; true when something was removed
    fn delete_path(&self, key: &str, path: &DocPath) -> Result<bool>;

    /// Append `values` to the array at `path`, returning the new length
    fn array_append(&self, key: &str, path: &DocPath, values: Vec<WireValue>) -> Result<usize>;

    /// Insert `value` into the array at `path` before `index`
    fn array_insert(&self, key: &str, path: &DocPath, index: usize, value: WireValue)
        -> Result<()>;

    /// Atomically remove and return the array element at `index`
    ///
    /// Negative indices count from the end (`-1` is the last element).
    /// Returns `Ok(None)` when the document, path, or index is absent.
    fn array_pop(&self, key: &str, path: &DocPath, index: i64) -> Result<Option<WireValue>>;

    /// Enumerate the keys of the object at `path`
    ///
    /// Returns `Ok(None)` when the document or path is absent. The reply is
    /// an array of key strings, but callers must tolerate the key set
    /// arriving nested one level deeper.
    fn object_keys(&self, key: &str, path: &DocPath) -> Result<Option<WireValue>>;

    /// Execute an atomic server-side script (see [`EvalScript`])
    fn eval(&self, script: &EvalScript, key: &str) -> Result<WireValue>;

    /// Whether the document exists
    fn exists(&self, key: &str) -> Result<bool>;

    /// Remove the whole document; true when it existed
    fn delete_doc(&self, key: &str) -> Result<bool>;

    /// Set the document's time-to-live; false when the document is absent
    fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// Atomically create the document with `value` and `ttl` only if absent
    ///
    /// Returns true when this call created the document (the lock primitive).
    fn set_if_not_exists(
        &self,
        key: &str,
        value: WireValue,
        ttl: Option<Duration>,
    ) -> Result<bool>;

    /// Apply several path writes to one document as a single atomic unit
    fn write_multi(&self, key: &str, writes: Vec<(DocPath, WireValue)>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Object safety: store handles are passed around as Arc<dyn DocumentStore>
    fn _accepts_dyn_store(_store: &dyn DocumentStore) {}
}
