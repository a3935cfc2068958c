//! Error types for docbind
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use thiserror::Error;

/// Result type alias for docbind operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for record binding and store access
#[derive(Debug, Error)]
pub enum Error {
    /// The targeted record does not exist at all
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Targeted key absent in a map/list pop with no default,
    /// or pop on an empty container
    #[error("key error: {0}")]
    KeyError(String),

    /// Value kind does not match the field's bound kind
    #[error("type mismatch at '{field}': expected {expected}, got {actual}")]
    TypeMismatch {
        /// The field (or path) being assigned
        field: String,
        /// Kind declared by the binding
        expected: String,
        /// Kind of the rejected value
        actual: String,
    },

    /// Operation invoked on a record that does not support it
    /// (e.g. delete/duplicate on a nested record)
    #[error("usage error: {0}")]
    Usage(String),

    /// Cyclic or unresolvable schema at bind time
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Codec or wire encode/decode failure
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Remote store failure surfaced through the command boundary
    #[error("store error: {0}")]
    Store(String),
}

impl Error {
    /// KeyError raised by `pop_arbitrary` on an empty map
    pub fn empty_map() -> Self {
        Error::KeyError("dictionary is empty".to_string())
    }

    /// TypeMismatch with stringified kinds
    pub fn type_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Error::TypeMismatch {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
