//! Map proxy
//!
//! Proxy over one string-keyed object sub-path. Entry writes target
//! `path.key`; the pop operations run through the atomic-ops engine so a
//! concurrent writer can never observe a half-popped entry.

use crate::atomic::AtomicOps;
use crate::handle::RecordHandle;
use crate::proxy::{
    check_assignable, decode_field, encode_field, fetch_value, write_value, BindState, FieldProxy,
};
use docbind_concurrency::PipelineBatch;
use docbind_core::{DocPath, Error, FieldValue, Result};
use docbind_schema::{BindingKind, PathBinding};
use docbind_store::WireValue;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Proxy over one map sub-path
pub struct MapProxy {
    handle: Arc<RecordHandle>,
    binding: Arc<PathBinding>,
    element: Arc<PathBinding>,
    path: DocPath,
    state: BindState,
    cache: BTreeMap<String, FieldValue>,
}

impl MapProxy {
    pub(crate) fn new(handle: Arc<RecordHandle>, binding: Arc<PathBinding>, path: DocPath) -> Self {
        let element = match &binding.kind {
            BindingKind::Map(element) => element.clone(),
            other => unreachable!("map proxy over {} binding", other.kind_name()),
        };
        Self {
            handle,
            binding,
            element,
            path,
            state: BindState::Detached,
            cache: BTreeMap::new(),
        }
    }

    /// The bound sub-path
    pub fn path(&self) -> &DocPath {
        &self.path
    }

    /// The proxy's binding state
    pub fn state(&self) -> BindState {
        self.state
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cached map is empty
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// The cached value under `key`
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.cache.get(key)
    }

    /// Whether `key` is cached
    pub fn contains_key(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    /// The cached entries
    pub fn entries(&self) -> &BTreeMap<String, FieldValue> {
        &self.cache
    }

    /// Detached copy of the cached map
    pub fn detach(&self) -> FieldValue {
        FieldValue::Map(self.cache.clone())
    }

    /// A fresh proxy bound to the entry slot under `key`
    ///
    /// Derived from the element binding on every call; a prior `set_item`
    /// never leaves a stale slot proxy behind.
    pub fn element_proxy(&self, key: &str) -> FieldProxy {
        FieldProxy::build(
            self.handle.clone(),
            self.element.clone(),
            self.path.clone().key(key),
        )
    }

    /// Fetch the map at the bound path, replacing the cache
    pub fn load(&mut self) -> Result<()> {
        let wire = fetch_value(&self.handle, &self.path)?;
        self.cache = match wire {
            Some(wire) => match decode_field(&self.binding, &self.path, &wire)? {
                FieldValue::Map(entries) => entries,
                FieldValue::Null => BTreeMap::new(),
                other => {
                    return Err(Error::Serialization(format!(
                        "expected map at '{}', decoded {}",
                        self.path,
                        other.kind_name()
                    )))
                }
            },
            None => BTreeMap::new(),
        };
        self.state = BindState::Bound;
        Ok(())
    }

    /// Replace the whole map and write it at the bound path
    pub fn set(&mut self, value: FieldValue, batch: Option<&mut PipelineBatch>) -> Result<()> {
        check_assignable(&self.binding, &self.path, &value)?;
        let wire = encode_field(&self.binding, &self.path, &value)?;
        self.state = write_value(&self.handle, &self.path, wire, batch)?;
        self.cache = match value {
            FieldValue::Map(entries) => entries,
            FieldValue::Null => BTreeMap::new(),
            _ => unreachable!("accepts() admitted a non-map"),
        };
        Ok(())
    }

    /// Write the cached map at the bound path
    pub fn save(&mut self, batch: Option<&mut PipelineBatch>) -> Result<()> {
        let wire = encode_field(&self.binding, &self.path, &FieldValue::Map(self.cache.clone()))?;
        self.state = write_value(&self.handle, &self.path, wire, batch)?;
        Ok(())
    }

    /// Set the entry slot under `key`
    pub fn set_item(
        &mut self,
        key: &str,
        value: FieldValue,
        batch: Option<&mut PipelineBatch>,
    ) -> Result<()> {
        let slot = self.path.clone().key(key);
        check_assignable(&self.element, &slot, &value)?;
        let wire = encode_field(&self.element, &slot, &value)?;
        self.state = write_value(&self.handle, &slot, wire, batch)?;
        self.cache.insert(key.to_string(), value);
        Ok(())
    }

    /// Empty the map locally and remotely
    pub fn clear(&mut self, batch: Option<&mut PipelineBatch>) -> Result<()> {
        self.cache.clear();
        self.state = write_value(
            &self.handle,
            &self.path,
            WireValue::Object(serde_json::Map::new()),
            batch,
        )?;
        Ok(())
    }

    /// Atomically pop the entry under `key`
    ///
    /// One server-side round trip removes and returns the entry; the local
    /// cache drops the same key. A missing key returns `default` when
    /// supplied, otherwise [`Error::KeyError`]. The stored map itself is
    /// never mutated on a miss.
    pub fn pop(&mut self, key: &str, default: Option<FieldValue>) -> Result<FieldValue> {
        let ops = AtomicOps::new(&self.handle);
        match ops.pop_key(&self.path, key)? {
            Some(wire) => {
                let value = decode_field(&self.element, &self.path.clone().key(key), &wire)?;
                self.cache.remove(key);
                Ok(value)
            }
            None => default.ok_or_else(|| Error::KeyError(format!("'{}'", key))),
        }
    }

    /// Atomically pop one arbitrary entry, returning `(key, value)`
    ///
    /// Picks the first key in enumeration order, then runs the same atomic
    /// read-delete-return as [`pop`]. An empty (or absent) map is
    /// `KeyError("dictionary is empty")`; losing the race for the chosen key
    /// to a concurrent writer surfaces as `KeyError` for that key.
    ///
    /// [`pop`]: MapProxy::pop
    pub fn pop_arbitrary(&mut self) -> Result<(String, FieldValue)> {
        let ops = AtomicOps::new(&self.handle);
        let key = ops.first_key(&self.path)?.ok_or_else(Error::empty_map)?;
        match ops.pop_key(&self.path, &key)? {
            Some(wire) => {
                let value = decode_field(&self.element, &self.path.clone().key(&key), &wire)?;
                self.cache.remove(&key);
                Ok((key, value))
            }
            None => Err(Error::KeyError(format!("'{}'", key))),
        }
    }

    pub(crate) fn set_local(&mut self, value: FieldValue) -> Result<()> {
        check_assignable(&self.binding, &self.path, &value)?;
        self.cache = match value {
            FieldValue::Map(entries) => entries,
            _ => BTreeMap::new(),
        };
        Ok(())
    }

    pub(crate) fn mark_state(&mut self, state: BindState) {
        self.state = state;
    }
}
