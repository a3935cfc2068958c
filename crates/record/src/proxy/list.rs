//! List proxy
//!
//! Proxy over one array sub-path. Element writes target `path[index]`;
//! `extend` issues one remote call for the whole batch of new items. The
//! atomic `pop` goes through the store's array-pop primitive and keeps the
//! local cache in sync with the single round trip.

use crate::atomic::AtomicOps;
use crate::handle::RecordHandle;
use crate::proxy::{
    check_assignable, decode_field, encode_field, fetch_value, write_value, BindState, FieldProxy,
};
use docbind_concurrency::PipelineBatch;
use docbind_core::{DocPath, Error, FieldValue, Result};
use docbind_schema::{BindingKind, PathBinding};
use docbind_store::{DocumentStore, WireValue};
use std::sync::Arc;

/// Proxy over one list sub-path
pub struct ListProxy {
    handle: Arc<RecordHandle>,
    binding: Arc<PathBinding>,
    element: Arc<PathBinding>,
    path: DocPath,
    state: BindState,
    cache: Vec<FieldValue>,
}

impl ListProxy {
    pub(crate) fn new(handle: Arc<RecordHandle>, binding: Arc<PathBinding>, path: DocPath) -> Self {
        let element = match &binding.kind {
            BindingKind::List(element) => element.clone(),
            other => unreachable!("list proxy over {} binding", other.kind_name()),
        };
        Self {
            handle,
            binding,
            element,
            path,
            state: BindState::Detached,
            cache: Vec::new(),
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

    /// Number of cached elements
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cached list is empty
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// The cached element at `index`
    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.cache.get(index)
    }

    /// The cached elements
    pub fn items(&self) -> &[FieldValue] {
        &self.cache
    }

    /// Detached copy of the cached list
    pub fn detach(&self) -> FieldValue {
        FieldValue::List(self.cache.clone())
    }

    /// A fresh proxy bound to the element slot at `index`
    ///
    /// Derived from the element binding on every call; a prior `set_item`
    /// never leaves a stale slot proxy behind.
    pub fn element_proxy(&self, index: usize) -> FieldProxy {
        FieldProxy::build(
            self.handle.clone(),
            self.element.clone(),
            self.path.clone().index(index),
        )
    }

    /// Fetch the list at the bound path, replacing the cache
    pub fn load(&mut self) -> Result<()> {
        let wire = fetch_value(&self.handle, &self.path)?;
        self.cache = match wire {
            Some(wire) => match decode_field(&self.binding, &self.path, &wire)? {
                FieldValue::List(items) => items,
                FieldValue::Null => Vec::new(),
                other => {
                    return Err(Error::Serialization(format!(
                        "expected list at '{}', decoded {}",
                        self.path,
                        other.kind_name()
                    )))
                }
            },
            None => Vec::new(),
        };
        self.state = BindState::Bound;
        Ok(())
    }

    /// Replace the whole list and write it at the bound path
    pub fn set(&mut self, value: FieldValue, batch: Option<&mut PipelineBatch>) -> Result<()> {
        check_assignable(&self.binding, &self.path, &value)?;
        let wire = encode_field(&self.binding, &self.path, &value)?;
        self.state = write_value(&self.handle, &self.path, wire, batch)?;
        self.cache = match value {
            FieldValue::List(items) => items,
            FieldValue::Null => Vec::new(),
            _ => unreachable!("accepts() admitted a non-list"),
        };
        Ok(())
    }

    /// Write the cached list at the bound path
    pub fn save(&mut self, batch: Option<&mut PipelineBatch>) -> Result<()> {
        let wire = self.cache_wire()?;
        self.state = write_value(&self.handle, &self.path, wire, batch)?;
        Ok(())
    }

    /// Append one element
    pub fn push(&mut self, value: FieldValue, batch: Option<&mut PipelineBatch>) -> Result<()> {
        self.extend(vec![value], batch)
    }

    /// Append a batch of elements with one remote call
    pub fn extend(
        &mut self,
        values: Vec<FieldValue>,
        batch: Option<&mut PipelineBatch>,
    ) -> Result<()> {
        let mut wires = Vec::with_capacity(values.len());
        for value in &values {
            let slot = self.path.clone().index(self.cache.len() + wires.len());
            check_assignable(&self.element, &slot, value)?;
            wires.push(encode_field(&self.element, &slot, value)?);
        }
        self.cache.extend(values);
        match batch {
            Some(batch) => {
                // Inside a pipeline the whole list is the pending value
                batch.stage(&self.handle.external_key(), self.path.clone(), self.cache_wire()?);
                self.state = BindState::Dirty;
            }
            None => {
                self.handle
                    .store()
                    .array_append(&self.handle.external_key(), &self.path, wires)?;
                self.state = BindState::Bound;
            }
        }
        Ok(())
    }

    /// Insert one element before `index`
    pub fn insert(
        &mut self,
        index: usize,
        value: FieldValue,
        batch: Option<&mut PipelineBatch>,
    ) -> Result<()> {
        if index > self.cache.len() {
            return Err(Error::KeyError(format!(
                "insert index {} out of range for length {}",
                index,
                self.cache.len()
            )));
        }
        let slot = self.path.clone().index(index);
        check_assignable(&self.element, &slot, &value)?;
        let wire = encode_field(&self.element, &slot, &value)?;
        self.cache.insert(index, value);
        match batch {
            Some(batch) => {
                batch.stage(&self.handle.external_key(), self.path.clone(), self.cache_wire()?);
                self.state = BindState::Dirty;
            }
            None => {
                self.handle
                    .store()
                    .array_insert(&self.handle.external_key(), &self.path, index, wire)?;
                self.state = BindState::Bound;
            }
        }
        Ok(())
    }

    /// Replace the element slot at `index`
    pub fn set_item(
        &mut self,
        index: usize,
        value: FieldValue,
        batch: Option<&mut PipelineBatch>,
    ) -> Result<()> {
        if index >= self.cache.len() {
            return Err(Error::KeyError(format!(
                "index {} out of range for length {}",
                index,
                self.cache.len()
            )));
        }
        let slot = self.path.clone().index(index);
        check_assignable(&self.element, &slot, &value)?;
        let wire = encode_field(&self.element, &slot, &value)?;
        self.state = write_value(&self.handle, &slot, wire, batch)?;
        self.cache[index] = value;
        Ok(())
    }

    /// Empty the list locally and remotely
    pub fn clear(&mut self, batch: Option<&mut PipelineBatch>) -> Result<()> {
        self.cache.clear();
        self.state = write_value(
            &self.handle,
            &self.path,
            WireValue::Array(Vec::new()),
            batch,
        )?;
        Ok(())
    }

    /// Atomically remove and return the element at `index`
    ///
    /// Negative indices count from the end. One round trip; the local cache
    /// drops the same slot. An absent index is [`Error::KeyError`].
    pub fn pop(&mut self, index: i64) -> Result<FieldValue> {
        let popped = AtomicOps::new(&self.handle)
            .pop_index(&self.path, index)?
            .ok_or_else(|| Error::KeyError(format!("pop index {} out of range", index)))?;
        let value = decode_field(&self.element, &self.path, &popped)?;
        let len = self.cache.len() as i64;
        let resolved = if index < 0 { len + index } else { index };
        if resolved >= 0 && resolved < len {
            self.cache.remove(resolved as usize);
        }
        Ok(value)
    }

    fn cache_wire(&self) -> Result<WireValue> {
        encode_field(
            &self.binding,
            &self.path,
            &FieldValue::List(self.cache.clone()),
        )
    }

    pub(crate) fn set_local(&mut self, value: FieldValue) -> Result<()> {
        check_assignable(&self.binding, &self.path, &value)?;
        self.cache = match value {
            FieldValue::List(items) => items,
            _ => Vec::new(),
        };
        Ok(())
    }

    pub(crate) fn mark_state(&mut self, state: BindState) {
        self.state = state;
    }
}
