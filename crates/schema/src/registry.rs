//! Schema registry
//!
//! Explicit, ahead-of-time registration of record shapes. The registry is an
//! owned context object passed to store/record setup — there is no
//! process-global shape table and no runtime type synthesis. Each registered
//! type is bound at most once; the resulting [`BoundSchema`] is cached and
//! immutable after first use.

use crate::binder::{SchemaBinder, ShapeSource};
use crate::binding::BoundSchema;
use crate::shape::RecordShape;
use docbind_core::{Error, Result};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

struct ShapeEntry {
    shape: Arc<RecordShape>,
    bound: OnceCell<Arc<BoundSchema>>,
}

/// Registry of declared record types
///
/// Thread-safe; typically built once at startup, registered, and shared.
#[derive(Default)]
pub struct SchemaRegistry {
    entries: RwLock<HashMap<String, Arc<ShapeEntry>>>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declared shape
    ///
    /// Fails with [`Error::Configuration`] when the type name is already
    /// registered — shapes are immutable once known.
    pub fn register(&self, shape: RecordShape) -> Result<()> {
        let mut entries = self.entries.write();
        let name = shape.type_name().to_string();
        if entries.contains_key(&name) {
            return Err(Error::Configuration(format!(
                "record type '{}' is already registered",
                name
            )));
        }
        entries.insert(
            name,
            Arc::new(ShapeEntry {
                shape: Arc::new(shape),
                bound: OnceCell::new(),
            }),
        );
        Ok(())
    }

    /// Register several shapes at once
    pub fn register_all(&self, shapes: impl IntoIterator<Item = RecordShape>) -> Result<()> {
        for shape in shapes {
            self.register(shape)?;
        }
        Ok(())
    }

    /// Whether a type name is registered
    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.read().contains_key(type_name)
    }

    /// The bound schema for a registered type
    ///
    /// Binds on first use and caches; later calls return the same Arc.
    pub fn bound(&self, type_name: &str) -> Result<Arc<BoundSchema>> {
        let entry = self
            .entries
            .read()
            .get(type_name)
            .cloned()
            .ok_or_else(|| {
                Error::Configuration(format!("record type '{}' is not registered", type_name))
            })?;
        entry
            .bound
            .get_or_try_init(|| SchemaBinder::new(self).bind(type_name))
            .cloned()
    }

    /// Registered type names (unordered)
    pub fn type_names(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

impl ShapeSource for SchemaRegistry {
    fn shape(&self, type_name: &str) -> Option<Arc<RecordShape>> {
        self.entries.read().get(type_name).map(|e| e.shape.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::FieldType;

    #[test]
    fn test_register_and_bind_once() {
        let registry = SchemaRegistry::new();
        registry
            .register(
                RecordShape::builder("customer")
                    .field("name", FieldType::string())
                    .build(),
            )
            .unwrap();

        let first = registry.bound("customer").unwrap();
        let second = registry.bound("customer").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = SchemaRegistry::new();
        let shape = RecordShape::builder("customer")
            .field("name", FieldType::string())
            .build();
        registry.register(shape.clone()).unwrap();
        assert!(registry.register(shape).is_err());
    }

    #[test]
    fn test_unknown_type_is_configuration_error() {
        let registry = SchemaRegistry::new();
        let err = registry.bound("ghost").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_bind_resolves_cross_references() {
        let registry = SchemaRegistry::new();
        registry
            .register_all([
                RecordShape::builder("customer")
                    .field("address", FieldType::record("address"))
                    .build(),
                RecordShape::builder("address")
                    .field("city", FieldType::string())
                    .build(),
            ])
            .unwrap();
        let bound = registry.bound("customer").unwrap();
        assert!(bound.field("address").is_some());
    }

    #[test]
    fn test_cycle_surfaces_from_bound() {
        let registry = SchemaRegistry::new();
        registry
            .register(
                RecordShape::builder("node")
                    .field("next", FieldType::record("node"))
                    .build(),
            )
            .unwrap();
        assert!(registry.bound("node").is_err());
    }
}
