//! docbind-core: foundations for record/document binding
//!
//! This crate defines the types every other docbind crate builds on:
//! - [`RecordKey`]: record identity, `"{type_name}:{primary_key}"`
//! - [`DocPath`] / [`PathSegment`]: paths into a JSON document, with
//!   traversal and mutation helpers over `serde_json::Value`
//! - [`FieldValue`]: detached plain values, one variant per field kind
//! - [`ScalarCodec`] and the built-in scalar/opaque codecs
//! - [`Error`] / [`Result`]: the workspace-wide error taxonomy

pub mod codec;
pub mod error;
pub mod key;
pub mod path;
pub mod value;

pub use codec::{codec_for, opaque_codec, ScalarCodec, ScalarKind};
pub use error::{Error, Result};
pub use key::RecordKey;
pub use path::{delete_at, get_at, get_at_mut, set_at, DocPath, PathError, PathSegment};
pub use value::FieldValue;
