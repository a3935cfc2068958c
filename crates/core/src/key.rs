//! Record identity
//!
//! A [`RecordKey`] names one remote JSON document: a registered type name plus
//! a primary key, rendered externally as `"{type_name}:{primary_key}"`.
//! Primary keys are random UUID v4 strings when not supplied by the caller.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of one record / remote document
///
/// The external string form is `"{type_name}:{primary_key}"`. The key is
/// treated as immutable once a mutation has been persisted under it; callers
/// may still reassign it deliberately, which re-targets every proxy bound to
/// the owning record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    type_name: String,
    primary_key: String,
}

impl RecordKey {
    /// Create a key with an explicit primary key
    pub fn new(type_name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            primary_key: primary_key.into(),
        }
    }

    /// Create a key with a freshly generated random primary key
    pub fn generate(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            primary_key: Uuid::new_v4().to_string(),
        }
    }

    /// Parse an external key string `"{type_name}:{primary_key}"`
    ///
    /// The primary key may itself contain `:`; only the first separator
    /// splits. Fails with [`Error::KeyNotFound`] on a malformed key, since a
    /// key that cannot name a document can never resolve to one.
    pub fn parse(external: &str) -> Result<Self> {
        match external.split_once(':') {
            Some((type_name, pk)) if !type_name.is_empty() && !pk.is_empty() => {
                Ok(Self::new(type_name, pk))
            }
            _ => Err(Error::KeyNotFound(external.to_string())),
        }
    }

    /// The registered type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The primary key within the type
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// The external key string used against the remote store
    pub fn external(&self) -> String {
        format!("{}:{}", self.type_name, self.primary_key)
    }

    /// Replace the primary key, keeping the type name
    pub fn with_primary_key(&self, primary_key: impl Into<String>) -> Self {
        Self {
            type_name: self.type_name.clone(),
            primary_key: primary_key.into(),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_name, self.primary_key)
    }
}
