//! Proxy containers
//!
//! A proxy is a typed handle over one sub-path of a record's document: it
//! caches the value locally and mediates remote reads and writes. One proxy
//! kind per binding kind — [`ScalarProxy`] (scalars and opaque leaves),
//! [`ListProxy`], [`MapProxy`], and nested [`Record`]s.
//!
//! # Base contract
//!
//! - `load()` fetches exactly the sub-document at the bound path and replaces
//!   the local cache. A missing document is [`Error::KeyNotFound`]; a missing
//!   sub-path under an existing document resolves to the binding's empty
//!   value.
//! - `save()` / `set(value)` write exactly the sub-document at the bound
//!   path; sibling paths are never touched.
//! - `detach()` returns the cached value as a plain [`FieldValue`] with no
//!   remote binding.
//!
//! Every mutating operation takes an explicit `Option<&mut PipelineBatch>`:
//! `None` writes through to the store immediately, `Some` stages the write
//! for the enclosing pipeline flush.

mod list;
mod map;
mod scalar;

pub use list::ListProxy;
pub use map::MapProxy;
pub use scalar::ScalarProxy;

use crate::handle::RecordHandle;
use crate::record::Record;
use docbind_concurrency::PipelineBatch;
use docbind_core::{codec_for, opaque_codec, DocPath, Error, FieldValue, Result};
use docbind_schema::{BindingKind, PathBinding};
use docbind_store::{DocumentStore, WireValue};
use std::sync::Arc;

/// Binding state of one proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindState {
    /// Constructed, nothing exchanged with the store yet
    Detached,
    /// Local cache agrees with the last-known-committed remote state
    Bound,
    /// Local cache diverges until the enclosing pipeline flushes
    Dirty,
}

/// One record field's proxy, matching its binding kind
pub enum FieldProxy {
    /// Scalar or opaque leaf
    Scalar(ScalarProxy),
    /// List container
    List(ListProxy),
    /// Map container
    Map(MapProxy),
    /// Nested record
    Record(Record),
}

impl FieldProxy {
    /// Build the proxy for `binding` at `path`
    pub(crate) fn build(
        handle: Arc<RecordHandle>,
        binding: Arc<PathBinding>,
        path: DocPath,
    ) -> FieldProxy {
        match &binding.kind {
            BindingKind::Scalar(_) | BindingKind::Opaque => {
                FieldProxy::Scalar(ScalarProxy::new(handle, binding, path))
            }
            BindingKind::List(_) => FieldProxy::List(ListProxy::new(handle, binding, path)),
            BindingKind::Map(_) => FieldProxy::Map(MapProxy::new(handle, binding, path)),
            BindingKind::Record(_) => {
                FieldProxy::Record(Record::nested(handle, binding, path))
            }
        }
    }

    /// The bound sub-path
    pub fn path(&self) -> &DocPath {
        match self {
            FieldProxy::Scalar(p) => p.path(),
            FieldProxy::List(p) => p.path(),
            FieldProxy::Map(p) => p.path(),
            FieldProxy::Record(p) => p.path(),
        }
    }

    /// Detached copy of the cached value
    pub fn detach(&self) -> FieldValue {
        match self {
            FieldProxy::Scalar(p) => p.detach(),
            FieldProxy::List(p) => p.detach(),
            FieldProxy::Map(p) => p.detach(),
            FieldProxy::Record(p) => p.detach(),
        }
    }

    /// Fetch the sub-document at the bound path into the cache
    pub fn load(&mut self) -> Result<()> {
        match self {
            FieldProxy::Scalar(p) => p.load().map(|_| ()),
            FieldProxy::List(p) => p.load(),
            FieldProxy::Map(p) => p.load(),
            FieldProxy::Record(p) => p.load(),
        }
    }

    /// Write the cached value at the bound path
    pub fn save(&mut self, batch: Option<&mut PipelineBatch>) -> Result<()> {
        match self {
            FieldProxy::Scalar(p) => p.save(batch),
            FieldProxy::List(p) => p.save(batch),
            FieldProxy::Map(p) => p.save(batch),
            FieldProxy::Record(p) => p.save(batch),
        }
    }

    /// Replace the cached value and write it at the bound path
    pub fn set(&mut self, value: FieldValue, batch: Option<&mut PipelineBatch>) -> Result<()> {
        match self {
            FieldProxy::Scalar(p) => p.set(value, batch),
            FieldProxy::List(p) => p.set(value, batch),
            FieldProxy::Map(p) => p.set(value, batch),
            FieldProxy::Record(p) => p.set(value, batch),
        }
    }

    /// Replace the cached value without any remote traffic
    pub(crate) fn set_local(&mut self, value: FieldValue) -> Result<()> {
        match self {
            FieldProxy::Scalar(p) => p.set_local(value),
            FieldProxy::List(p) => p.set_local(value),
            FieldProxy::Map(p) => p.set_local(value),
            FieldProxy::Record(p) => p.set_local(value),
        }
    }

    /// Force the binding state (after a whole-record save or load)
    pub(crate) fn mark_state(&mut self, state: BindState) {
        match self {
            FieldProxy::Scalar(p) => p.mark_state(state),
            FieldProxy::List(p) => p.mark_state(state),
            FieldProxy::Map(p) => p.mark_state(state),
            FieldProxy::Record(p) => p.mark_state(state),
        }
    }

    /// Scalar accessor
    pub fn as_scalar(&self) -> Option<&ScalarProxy> {
        match self {
            FieldProxy::Scalar(p) => Some(p),
            _ => None,
        }
    }

    /// Mutable scalar accessor
    pub fn as_scalar_mut(&mut self) -> Option<&mut ScalarProxy> {
        match self {
            FieldProxy::Scalar(p) => Some(p),
            _ => None,
        }
    }

    /// List accessor
    pub fn as_list(&self) -> Option<&ListProxy> {
        match self {
            FieldProxy::List(p) => Some(p),
            _ => None,
        }
    }

    /// Mutable list accessor
    pub fn as_list_mut(&mut self) -> Option<&mut ListProxy> {
        match self {
            FieldProxy::List(p) => Some(p),
            _ => None,
        }
    }

    /// Map accessor
    pub fn as_map(&self) -> Option<&MapProxy> {
        match self {
            FieldProxy::Map(p) => Some(p),
            _ => None,
        }
    }

    /// Mutable map accessor
    pub fn as_map_mut(&mut self) -> Option<&mut MapProxy> {
        match self {
            FieldProxy::Map(p) => Some(p),
            _ => None,
        }
    }

    /// Nested record accessor
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            FieldProxy::Record(p) => Some(p),
            _ => None,
        }
    }

    /// Mutable nested record accessor
    pub fn as_record_mut(&mut self) -> Option<&mut Record> {
        match self {
            FieldProxy::Record(p) => Some(p),
            _ => None,
        }
    }
}

// =============================================================================
// Shared plumbing
// =============================================================================

/// Fetch the sub-document at `path`
///
/// `Ok(None)` means the document exists but the sub-path is absent; a missing
/// document is [`Error::KeyNotFound`].
pub(crate) fn fetch_value(handle: &RecordHandle, path: &DocPath) -> Result<Option<WireValue>> {
    let key = handle.external_key();
    match handle.store().get(&key, path)? {
        Some(wire) => Ok(Some(wire)),
        None if handle.store().exists(&key)? => Ok(None),
        None => Err(Error::KeyNotFound(key)),
    }
}

/// Write `wire` at `path`, either through to the store or into the batch
pub(crate) fn write_value(
    handle: &RecordHandle,
    path: &DocPath,
    wire: WireValue,
    batch: Option<&mut PipelineBatch>,
) -> Result<BindState> {
    match batch {
        Some(batch) => {
            batch.stage(&handle.external_key(), path.clone(), wire);
            Ok(BindState::Dirty)
        }
        None => {
            handle.store().set(&handle.external_key(), path, wire)?;
            Ok(BindState::Bound)
        }
    }
}

/// Reject a value whose kind does not match the binding
pub(crate) fn check_assignable(
    binding: &PathBinding,
    at: &DocPath,
    value: &FieldValue,
) -> Result<()> {
    if binding.accepts(value) {
        Ok(())
    } else {
        let mut expected = binding.kind.kind_name().to_string();
        if binding.nullable {
            expected.push('?');
        }
        Err(Error::type_mismatch(
            at.to_string(),
            expected,
            value.kind_name(),
        ))
    }
}

/// Encode a detached value into its wire form per `binding`
pub(crate) fn encode_field(
    binding: &PathBinding,
    at: &DocPath,
    value: &FieldValue,
) -> Result<WireValue> {
    if value.is_null() {
        return Ok(WireValue::Null);
    }
    match (&binding.kind, value) {
        (BindingKind::Scalar(kind), v) => codec_for(*kind).encode(v),
        (BindingKind::Opaque, v) => opaque_codec().encode(v),
        (BindingKind::List(element), FieldValue::List(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(encode_field(element, &at.clone().index(i), item)?);
            }
            Ok(WireValue::Array(out))
        }
        (BindingKind::Map(element), FieldValue::Map(entries)) => {
            let mut out = serde_json::Map::new();
            for (key, item) in entries {
                out.insert(key.clone(), encode_field(element, &at.clone().key(key), item)?);
            }
            Ok(WireValue::Object(out))
        }
        (BindingKind::Record(schema), FieldValue::Record(fields)) => {
            for key in fields.keys() {
                if schema.field(key).is_none() {
                    return Err(Error::Serialization(format!(
                        "record type '{}' has no field '{}'",
                        schema.type_name, key
                    )));
                }
            }
            let mut out = serde_json::Map::new();
            for field in &schema.fields {
                let field_path = at.clone().key(&field.name);
                let value = fields
                    .get(&field.name)
                    .cloned()
                    .unwrap_or_else(|| field.empty_value());
                out.insert(
                    field.name.clone(),
                    encode_field(field, &field_path, &value)?,
                );
            }
            Ok(WireValue::Object(out))
        }
        (kind, other) => Err(Error::type_mismatch(
            at.to_string(),
            kind.kind_name(),
            other.kind_name(),
        )),
    }
}

/// Decode a wire value back into a detached value per `binding`
///
/// A wire null resolves through [`PathBinding::empty_value`]: null for
/// nullable bindings, the kind's empty value otherwise.
pub(crate) fn decode_field(
    binding: &PathBinding,
    at: &DocPath,
    wire: &WireValue,
) -> Result<FieldValue> {
    if wire.is_null() {
        return Ok(binding.empty_value());
    }
    match &binding.kind {
        BindingKind::Scalar(kind) => codec_for(*kind).decode(wire),
        BindingKind::Opaque => opaque_codec().decode(wire),
        BindingKind::List(element) => {
            let items = wire.as_array().ok_or_else(|| {
                Error::Serialization(format!("expected array at '{}'", at))
            })?;
            items
                .iter()
                .enumerate()
                .map(|(i, item)| decode_field(element, &at.clone().index(i), item))
                .collect::<Result<Vec<_>>>()
                .map(FieldValue::List)
        }
        BindingKind::Map(element) => {
            let entries = wire.as_object().ok_or_else(|| {
                Error::Serialization(format!("expected object at '{}'", at))
            })?;
            entries
                .iter()
                .map(|(key, item)| {
                    decode_field(element, &at.clone().key(key), item)
                        .map(|decoded| (key.clone(), decoded))
                })
                .collect::<Result<_>>()
                .map(FieldValue::Map)
        }
        BindingKind::Record(schema) => {
            let obj = wire.as_object().ok_or_else(|| {
                Error::Serialization(format!("expected object at '{}'", at))
            })?;
            let mut fields = std::collections::BTreeMap::new();
            for field in &schema.fields {
                let value = match obj.get(&field.name) {
                    Some(wire) => decode_field(field, &at.clone().key(&field.name), wire)?,
                    None => field.empty_value(),
                };
                fields.insert(field.name.clone(), value);
            }
            Ok(FieldValue::Record(fields))
        }
    }
}
