//! Scalar codecs
//!
//! The serialization seam between [`FieldValue`] and the wire values the
//! remote document store holds (`serde_json::Value`). One codec per scalar
//! kind plus the opaque fallback codec for declared-opaque fields.
//!
//! # Thread Safety
//!
//! Codecs must be `Send + Sync`; the built-in codecs are stateless statics
//! handed out by [`codec_for`].
//!
//! # Wire forms
//!
//! | Kind | Wire form |
//! |-----------|--------------------------------|
//! | string | JSON string |
//! | integer | JSON number (i64) |
//! | float | JSON number (f64) |
//! | boolean | JSON bool |
//! | bytes | base64 JSON string |
//! | timestamp | RFC 3339 JSON string |
//! | opaque | base64 JSON string of a bincode payload |
//!
//! JSON null always decodes to [`FieldValue::Null`]; whether null is allowed
//! for a field is the binding's concern, not the codec's.

use crate::error::{Error, Result};
use crate::value::FieldValue;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The natively supported scalar kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Integer,
    /// 64-bit float
    Float,
    /// Boolean
    Boolean,
    /// Byte string
    Bytes,
    /// UTC timestamp
    Timestamp,
}

impl ScalarKind {
    /// Kind name for errors and logs
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "integer",
            ScalarKind::Float => "float",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Bytes => "bytes",
            ScalarKind::Timestamp => "timestamp",
        }
    }

    /// The kind's declared empty value
    ///
    /// Returned when a sub-path is missing under an existing record: empty
    /// string, zero, false, empty bytes, the Unix epoch.
    pub fn empty_value(&self) -> FieldValue {
        match self {
            ScalarKind::String => FieldValue::Str(String::new()),
            ScalarKind::Integer => FieldValue::Int(0),
            ScalarKind::Float => FieldValue::Float(0.0),
            ScalarKind::Boolean => FieldValue::Bool(false),
            ScalarKind::Bytes => FieldValue::Bytes(Vec::new()),
            ScalarKind::Timestamp => FieldValue::Timestamp(DateTime::<Utc>::UNIX_EPOCH),
        }
    }

    /// Whether a detached value matches this kind (null never matches)
    pub fn matches(&self, value: &FieldValue) -> bool {
        matches!(
            (self, value),
            (ScalarKind::String, FieldValue::Str(_))
                | (ScalarKind::Integer, FieldValue::Int(_))
                | (ScalarKind::Float, FieldValue::Float(_))
                | (ScalarKind::Boolean, FieldValue::Bool(_))
                | (ScalarKind::Bytes, FieldValue::Bytes(_))
                | (ScalarKind::Timestamp, FieldValue::Timestamp(_))
        )
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Value codec trait
///
/// `encode` turns a detached value into its wire form; `decode` reverses it.
/// Both directions fail with [`Error::Serialization`] on a value the codec
/// does not handle.
pub trait ScalarCodec: Send + Sync {
    /// Codec identity, used in error messages
    fn codec_id(&self) -> &'static str;

    /// Encode a detached value into a wire value
    fn encode(&self, value: &FieldValue) -> Result<serde_json::Value>;

    /// Decode a wire value back into a detached value
    fn decode(&self, wire: &serde_json::Value) -> Result<FieldValue>;
}

/// Built-in codec for one scalar kind
struct KindCodec {
    kind: ScalarKind,
}

impl KindCodec {
    fn unexpected(&self, what: &str) -> Error {
        Error::Serialization(format!(
            "codec '{}' cannot handle {}",
            self.kind.name(),
            what
        ))
    }
}

impl ScalarCodec for KindCodec {
    fn codec_id(&self) -> &'static str {
        self.kind.name()
    }

    fn encode(&self, value: &FieldValue) -> Result<serde_json::Value> {
        match (self.kind, value) {
            (_, FieldValue::Null) => Ok(serde_json::Value::Null),
            (ScalarKind::String, FieldValue::Str(s)) => Ok(serde_json::Value::String(s.clone())),
            (ScalarKind::Integer, FieldValue::Int(i)) => Ok(serde_json::json!(i)),
            (ScalarKind::Float, FieldValue::Float(x)) => {
                serde_json::Number::from_f64(*x)
                    .map(serde_json::Value::Number)
                    .ok_or_else(|| self.unexpected("a non-finite float"))
            }
            (ScalarKind::Boolean, FieldValue::Bool(b)) => Ok(serde_json::Value::Bool(*b)),
            (ScalarKind::Bytes, FieldValue::Bytes(bytes)) => {
                Ok(serde_json::Value::String(BASE64.encode(bytes)))
            }
            (ScalarKind::Timestamp, FieldValue::Timestamp(ts)) => Ok(serde_json::Value::String(
                ts.to_rfc3339_opts(SecondsFormat::Micros, true),
            )),
            (_, other) => Err(self.unexpected(other.kind_name())),
        }
    }

    fn decode(&self, wire: &serde_json::Value) -> Result<FieldValue> {
        if wire.is_null() {
            return Ok(FieldValue::Null);
        }
        match self.kind {
            ScalarKind::String => wire
                .as_str()
                .map(|s| FieldValue::Str(s.to_string()))
                .ok_or_else(|| self.unexpected("a non-string wire value")),
            ScalarKind::Integer => wire
                .as_i64()
                .map(FieldValue::Int)
                .ok_or_else(|| self.unexpected("a non-integer wire value")),
            ScalarKind::Float => wire
                .as_f64()
                .map(FieldValue::Float)
                .ok_or_else(|| self.unexpected("a non-numeric wire value")),
            ScalarKind::Boolean => wire
                .as_bool()
                .map(FieldValue::Bool)
                .ok_or_else(|| self.unexpected("a non-boolean wire value")),
            ScalarKind::Bytes => {
                let s = wire
                    .as_str()
                    .ok_or_else(|| self.unexpected("a non-string wire value"))?;
                let bytes = BASE64
                    .decode(s)
                    .map_err(|e| Error::Serialization(format!("invalid base64: {}", e)))?;
                Ok(FieldValue::Bytes(bytes))
            }
            ScalarKind::Timestamp => {
                let s = wire
                    .as_str()
                    .ok_or_else(|| self.unexpected("a non-string wire value"))?;
                let ts = DateTime::parse_from_rfc3339(s)
                    .map_err(|e| Error::Serialization(format!("invalid timestamp: {}", e)))?;
                Ok(FieldValue::Timestamp(ts.with_timezone(&Utc)))
            }
        }
    }
}

/// Opaque fallback codec
///
/// The payload is already a bincode-encoded byte string (see
/// [`FieldValue::opaque_from`]); on the wire it travels base64-encoded so the
/// document stays valid JSON.
struct OpaqueCodec;

impl ScalarCodec for OpaqueCodec {
    fn codec_id(&self) -> &'static str {
        "opaque"
    }

    fn encode(&self, value: &FieldValue) -> Result<serde_json::Value> {
        match value {
            FieldValue::Null => Ok(serde_json::Value::Null),
            FieldValue::Opaque(bytes) => Ok(serde_json::Value::String(BASE64.encode(bytes))),
            other => Err(Error::Serialization(format!(
                "codec 'opaque' cannot handle {}",
                other.kind_name()
            ))),
        }
    }

    fn decode(&self, wire: &serde_json::Value) -> Result<FieldValue> {
        match wire {
            serde_json::Value::Null => Ok(FieldValue::Null),
            serde_json::Value::String(s) => {
                let bytes = BASE64
                    .decode(s)
                    .map_err(|e| Error::Serialization(format!("invalid base64: {}", e)))?;
                Ok(FieldValue::Opaque(bytes))
            }
            other => Err(Error::Serialization(format!(
                "codec 'opaque' cannot handle a {} wire value",
                crate::path::json_type_name(other)
            ))),
        }
    }
}

static STRING_CODEC: KindCodec = KindCodec {
    kind: ScalarKind::String,
};
static INTEGER_CODEC: KindCodec = KindCodec {
    kind: ScalarKind::Integer,
};
static FLOAT_CODEC: KindCodec = KindCodec {
    kind: ScalarKind::Float,
};
static BOOLEAN_CODEC: KindCodec = KindCodec {
    kind: ScalarKind::Boolean,
};
static BYTES_CODEC: KindCodec = KindCodec {
    kind: ScalarKind::Bytes,
};
static TIMESTAMP_CODEC: KindCodec = KindCodec {
    kind: ScalarKind::Timestamp,
};
static OPAQUE_CODEC: OpaqueCodec = OpaqueCodec;

/// The built-in codec for a scalar kind
pub fn codec_for(kind: ScalarKind) -> &'static dyn ScalarCodec {
    match kind {
        ScalarKind::String => &STRING_CODEC,
        ScalarKind::Integer => &INTEGER_CODEC,
        ScalarKind::Float => &FLOAT_CODEC,
        ScalarKind::Boolean => &BOOLEAN_CODEC,
        ScalarKind::Bytes => &BYTES_CODEC,
        ScalarKind::Timestamp => &TIMESTAMP_CODEC,
    }
}

/// The opaque fallback codec
pub fn opaque_codec() -> &'static dyn ScalarCodec {
    &OPAQUE_CODEC
}
