//! Atomic compound operations
//!
//! [`AtomicOps`] is the engine behind map `pop` / `pop_arbitrary` and list
//! `pop`: compound read-delete-return operations that are race-free against
//! concurrent writers on the same sub-path without taking the distributed
//! lock. The read-and-delete itself always runs server-side in one round
//! trip (an [`EvalScript`] or the array-pop primitive); the callers then drop
//! the same entry from their local cache, so local and remote state stay
//! consistent without a re-load.

use crate::handle::RecordHandle;
use docbind_core::{DocPath, Error, Result};
use docbind_store::{decode_reply, DocumentStore, EvalScript, WireValue};

/// Atomic compound operations against one record's document
pub struct AtomicOps<'a> {
    handle: &'a RecordHandle,
}

impl<'a> AtomicOps<'a> {
    /// Operations against the record behind `handle`
    pub fn new(handle: &'a RecordHandle) -> Self {
        Self { handle }
    }

    /// Atomically read, delete, and return the value at `path`.`entry`
    ///
    /// `Ok(None)` when the entry is absent. The eval channel's reply arrives
    /// JSON-encoded; the value returned here is the plain wire value.
    pub fn pop_key(&self, path: &DocPath, entry: &str) -> Result<Option<WireValue>> {
        let script = EvalScript::pop_key(path.clone(), entry);
        let reply = self
            .handle
            .store()
            .eval(&script, &self.handle.external_key())?;
        decode_reply(&reply)
            .map_err(|e| Error::Serialization(format!("undecodable eval reply: {}", e)))
    }

    /// First key of the object at `path`, in enumeration order
    ///
    /// `Ok(None)` when the object is absent or empty. Tolerates the
    /// enumeration reply arriving nested one level deep.
    pub fn first_key(&self, path: &DocPath) -> Result<Option<String>> {
        let reply = self
            .handle
            .store()
            .object_keys(&self.handle.external_key(), path)?;
        Ok(reply
            .as_ref()
            .and_then(unwrap_keys)
            .and_then(|keys| keys.into_iter().next()))
    }

    /// Atomically remove and return the array element at `index`
    pub fn pop_index(&self, path: &DocPath, index: i64) -> Result<Option<WireValue>> {
        self.handle
            .store()
            .array_pop(&self.handle.external_key(), path, index)
    }
}

/// Flatten a key-enumeration reply, unwrapping one level of nesting
fn unwrap_keys(reply: &WireValue) -> Option<Vec<String>> {
    let arr = reply.as_array()?;
    let arr = match arr.as_slice() {
        [WireValue::Array(inner)] => inner,
        _ => arr,
    };
    Some(
        arr.iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_keys_plain() {
        assert_eq!(
            unwrap_keys(&json!(["a", "b"])),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_unwrap_keys_nested_one_level() {
        assert_eq!(
            unwrap_keys(&json!([["a", "b"]])),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_unwrap_keys_empty_and_non_array() {
        assert_eq!(unwrap_keys(&json!([])), Some(vec![]));
        assert_eq!(unwrap_keys(&json!("nope")), None);
    }
}
