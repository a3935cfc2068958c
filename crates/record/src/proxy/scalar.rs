//! Scalar proxy
//!
//! Covers scalar and opaque leaf bindings. The cache holds one detached
//! value; `set` writes exactly the bound sub-path.

use crate::handle::RecordHandle;
use crate::proxy::{check_assignable, decode_field, encode_field, fetch_value, write_value, BindState};
use docbind_concurrency::PipelineBatch;
use docbind_core::{DocPath, FieldValue, Result};
use docbind_schema::PathBinding;
use std::sync::Arc;

/// Proxy over one scalar (or opaque) sub-path
pub struct ScalarProxy {
    handle: Arc<RecordHandle>,
    binding: Arc<PathBinding>,
    path: DocPath,
    state: BindState,
    cache: FieldValue,
}

impl ScalarProxy {
    pub(crate) fn new(handle: Arc<RecordHandle>, binding: Arc<PathBinding>, path: DocPath) -> Self {
        let cache = binding.empty_value();
        Self {
            handle,
            binding,
            path,
            state: BindState::Detached,
            cache,
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

    /// The cached value
    pub fn get(&self) -> &FieldValue {
        &self.cache
    }

    /// Detached copy of the cached value
    pub fn detach(&self) -> FieldValue {
        self.cache.clone()
    }

    /// Fetch the value at the bound path, replacing the cache
    pub fn load(&mut self) -> Result<&FieldValue> {
        let wire = fetch_value(&self.handle, &self.path)?;
        self.cache = match wire {
            Some(wire) => decode_field(&self.binding, &self.path, &wire)?,
            None => self.binding.empty_value(),
        };
        self.state = BindState::Bound;
        Ok(&self.cache)
    }

    /// Replace the cache and write the value at the bound path
    pub fn set(&mut self, value: FieldValue, batch: Option<&mut PipelineBatch>) -> Result<()> {
        check_assignable(&self.binding, &self.path, &value)?;
        let wire = encode_field(&self.binding, &self.path, &value)?;
        self.state = write_value(&self.handle, &self.path, wire, batch)?;
        self.cache = value;
        Ok(())
    }

    /// Write the cached value at the bound path
    pub fn save(&mut self, batch: Option<&mut PipelineBatch>) -> Result<()> {
        let wire = encode_field(&self.binding, &self.path, &self.cache)?;
        self.state = write_value(&self.handle, &self.path, wire, batch)?;
        Ok(())
    }

    pub(crate) fn set_local(&mut self, value: FieldValue) -> Result<()> {
        check_assignable(&self.binding, &self.path, &value)?;
        self.cache = value;
        Ok(())
    }

    pub(crate) fn mark_state(&mut self, state: BindState) {
        self.state = state;
    }
}
