//! docbind-schema: declared shapes and path binding
//!
//! Record types are declared as [`RecordShape`]s (ordered named fields over a
//! closed [`FieldType`] system), registered into a [`SchemaRegistry`], and
//! bound once into [`BoundSchema`]/[`PathBinding`] trees that the proxy layer
//! consumes.

pub mod binder;
pub mod binding;
pub mod registry;
pub mod shape;

pub use binder::{SchemaBinder, ShapeSource};
pub use binding::{BindingKind, BoundSchema, PathBinding};
pub use registry::SchemaRegistry;
pub use shape::{FieldDef, FieldType, RecordShape, RecordShapeBuilder};
