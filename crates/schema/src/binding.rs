//! Path bindings
//!
//! The binder's output: a [`BoundSchema`] holds one [`PathBinding`] per field,
//! and container bindings carry the binding of their element. Bindings are
//! computed once per registered type and shared behind `Arc`; a child
//! binding's full path is its parent's path plus its own segment, composed at
//! proxy-construction time (container elements only know their position at
//! runtime).

use docbind_core::{FieldValue, ScalarKind};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Resolved kind of one binding
#[derive(Debug, Clone)]
pub enum BindingKind {
    /// Scalar leaf with a built-in codec
    Scalar(ScalarKind),
    /// Opaque-codec leaf
    Opaque,
    /// List node; the element binding applies at every index
    List(Arc<PathBinding>),
    /// Map node; the element binding applies under every key
    Map(Arc<PathBinding>),
    /// Nested record node
    Record(Arc<BoundSchema>),
}

impl BindingKind {
    /// Kind name for errors and logs
    pub fn kind_name(&self) -> &'static str {
        match self {
            BindingKind::Scalar(kind) => kind.name(),
            BindingKind::Opaque => "opaque",
            BindingKind::List(_) => "list",
            BindingKind::Map(_) => "map",
            BindingKind::Record(_) => "record",
        }
    }

    /// Whether a detached value matches this kind (null never matches)
    pub fn matches(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (BindingKind::Scalar(kind), v) => kind.matches(v),
            (BindingKind::Opaque, FieldValue::Opaque(_)) => true,
            (BindingKind::List(_), FieldValue::List(_)) => true,
            (BindingKind::Map(_), FieldValue::Map(_)) => true,
            (BindingKind::Record(_), FieldValue::Record(_)) => true,
            _ => false,
        }
    }
}

/// One field's binding inside a bound schema
#[derive(Debug, Clone)]
pub struct PathBinding {
    /// Field name; empty for container element bindings
    pub name: String,
    /// Resolved kind
    pub kind: BindingKind,
    /// Whether null is an allowed stored value (from `Optional` wrapping)
    pub nullable: bool,
}

impl PathBinding {
    /// The value a missing sub-path resolves to under an existing record
    ///
    /// Nullable bindings resolve to null; everything else to the kind's
    /// declared empty value.
    pub fn empty_value(&self) -> FieldValue {
        if self.nullable {
            return FieldValue::Null;
        }
        match &self.kind {
            BindingKind::Scalar(kind) => kind.empty_value(),
            BindingKind::Opaque => FieldValue::Opaque(Vec::new()),
            BindingKind::List(_) => FieldValue::List(Vec::new()),
            BindingKind::Map(_) => FieldValue::Map(BTreeMap::new()),
            BindingKind::Record(schema) => FieldValue::Record(
                schema
                    .fields
                    .iter()
                    .map(|f| (f.name.clone(), f.empty_value()))
                    .collect(),
            ),
        }
    }

    /// Whether a detached value may be assigned to this binding
    pub fn accepts(&self, value: &FieldValue) -> bool {
        if value.is_null() {
            return self.nullable;
        }
        self.kind.matches(value)
    }
}

/// The bound form of one registered record shape
#[derive(Debug, Clone)]
pub struct BoundSchema {
    /// The registered type name
    pub type_name: String,
    /// Field bindings in declaration order (inheritance resolved)
    pub fields: Vec<Arc<PathBinding>>,
}

impl BoundSchema {
    /// Look up a field binding by name
    pub fn field(&self, name: &str) -> Option<&Arc<PathBinding>> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}
