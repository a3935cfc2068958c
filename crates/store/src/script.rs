//! Server-evaluated atomic scripts
//!
//! The compound operations of the proxy layer (map pop-and-delete, map
//! pop-arbitrary-key) must be race-free against concurrent writers on the
//! same sub-path without holding the distributed lock. They run as a single
//! server-side script through [`DocumentStore::eval`]: no other writer can
//! observe or mutate the value between the read and the delete.
//!
//! # Reply encoding
//!
//! The eval channel replies with a JSON array sentinel:
//!
//! - `[]` — the targeted key was absent
//! - `[<string>]` — the popped value, JSON-encoded as a string
//!
//! The string wrapping is the channel's wire encoding; callers decode the
//! element back to a wire value before handing it to a codec. The array
//! sentinel keeps a popped stored `null` distinguishable from a missing key.
//!
//! [`DocumentStore::eval`]: crate::traits::DocumentStore::eval

use docbind_core::DocPath;

/// An atomic script executed server-side in one round trip
#[derive(Debug, Clone, PartialEq)]
pub enum EvalScript {
    /// Read the value at `path`.`key`, delete it if present, return it
    PopKey {
        /// Path of the containing object
        path: DocPath,
        /// Key to pop from the object
        key: String,
    },
}

impl EvalScript {
    /// Script for popping `key` out of the object at `path`
    pub fn pop_key(path: DocPath, key: impl Into<String>) -> Self {
        EvalScript::PopKey {
            path,
            key: key.into(),
        }
    }
}

/// Build the not-found sentinel reply
pub fn reply_not_found() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

/// Build the found reply carrying `value` in the channel's wire encoding
pub fn reply_found(value: &serde_json::Value) -> serde_json::Value {
    serde_json::Value::Array(vec![serde_json::Value::String(value.to_string())])
}

/// Decode an eval reply back into the popped wire value
///
/// Returns `Ok(None)` for the not-found sentinel. Malformed replies are a
/// store error surfaced as `Err`.
pub fn decode_reply(
    reply: &serde_json::Value,
) -> Result<Option<serde_json::Value>, serde_json::Error> {
    match reply.as_array().map(Vec::as_slice) {
        Some([]) => Ok(None),
        Some([serde_json::Value::String(encoded)]) => {
            serde_json::from_str(encoded).map(Some)
        }
        // Anything else decodes as-is: a permissive channel may already have
        // unwrapped the encoding.
        Some([value]) => Ok(Some(value.clone())),
        _ => Ok(Some(reply.clone())),
    }
}
