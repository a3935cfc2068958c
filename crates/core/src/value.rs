//! Detached field values
//!
//! [`FieldValue`] is the plain, unbound value a proxy caches locally and hands
//! out from `detach()`. It mirrors the supported field kinds one to one:
//! scalars (string, integer, float, boolean, bytes, timestamp), containers
//! (list, map, nested record), and the opaque binary payload.
//!
//! `FieldValue` carries no remote binding; converting it to and from the wire
//! representation is the codec layer's job (see [`crate::codec`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A plain value for one record field, detached from any remote document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Absent value for a nullable field
    Null,
    /// Boolean scalar
    Bool(bool),
    /// Integer scalar
    Int(i64),
    /// Float scalar
    Float(f64),
    /// String scalar
    Str(String),
    /// Byte-string scalar
    Bytes(Vec<u8>),
    /// Timestamp scalar (UTC)
    Timestamp(DateTime<Utc>),
    /// List of element values
    List(Vec<FieldValue>),
    /// String-keyed map of element values
    Map(BTreeMap<String, FieldValue>),
    /// Nested record, field name to value
    Record(BTreeMap<String, FieldValue>),
    /// Opaque binary payload (see the opaque codec)
    Opaque(Vec<u8>),
}

impl FieldValue {
    /// Short kind name for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "boolean",
            FieldValue::Int(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Str(_) => "string",
            FieldValue::Bytes(_) => "bytes",
            FieldValue::Timestamp(_) => "timestamp",
            FieldValue::List(_) => "list",
            FieldValue::Map(_) => "map",
            FieldValue::Record(_) => "record",
            FieldValue::Opaque(_) => "opaque",
        }
    }

    /// Whether this is [`FieldValue::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Encode any serde-serializable value into an opaque payload
    pub fn opaque_from<T: Serialize>(value: &T) -> Result<Self, bincode::Error> {
        Ok(FieldValue::Opaque(bincode::serialize(value)?))
    }

    /// Decode an opaque payload back into its original shape
    ///
    /// Returns None when called on a non-opaque value.
    pub fn opaque_to<T: for<'de> Deserialize<'de>>(&self) -> Option<Result<T, bincode::Error>> {
        match self {
            FieldValue::Opaque(bytes) => Some(bincode::deserialize(bytes)),
            _ => None,
        }
    }

    /// String accessor
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Integer accessor
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Float accessor
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Boolean accessor
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// List accessor
    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Map accessor
    pub fn as_map(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match self {
            FieldValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Nested record accessor
    pub fn as_record(&self) -> Option<&BTreeMap<String, FieldValue>> {
        match self {
            FieldValue::Record(fields) => Some(fields),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Str(s) => write!(f, "{:?}", s),
            FieldValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            FieldValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            FieldValue::List(items) => write!(f, "<list of {}>", items.len()),
            FieldValue::Map(entries) => write!(f, "<map of {}>", entries.len()),
            FieldValue::Record(fields) => write!(f, "<record of {}>", fields.len()),
            FieldValue::Opaque(b) => write!(f, "<opaque {} bytes>", b.len()),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Str(v)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        FieldValue::Bytes(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(v: Vec<T>) -> Self {
        FieldValue::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => FieldValue::Null,
        }
    }
}
