//! Schema binder
//!
//! [`SchemaBinder`] rewrites a declared [`RecordShape`] into a
//! [`BoundSchema`]: a depth-first walk of the declared types that resolves
//! every field to a [`PathBinding`] leaf or node.
//!
//! - scalar kinds bind to a Scalar leaf with the built-in codec
//! - `List<T>` / `Map<String, T>` bind to container nodes whose element
//!   binding is computed by recursing on `T`
//! - nested record references recursively bind the referenced shape
//! - `Optional<T>` is transparent: the inner type binds with the
//!   null-allowed flag set
//! - `Opaque` binds to the opaque-codec leaf
//!
//! A shape extending another starts from the parent's resolved fields; a
//! field re-declared in the subtype overrides its ancestor's binding at that
//! name, keeping the ancestor's position (last writer in the inheritance
//! chain wins). Cyclic type graphs are rejected with
//! [`Error::Configuration`], as are duplicate field names within one shape
//! and references to unregistered types.

use crate::binding::{BindingKind, BoundSchema, PathBinding};
use crate::shape::{FieldDef, FieldType, RecordShape};
use docbind_core::{Error, Result};
use std::sync::Arc;

/// Source of declared shapes by type name
///
/// Implemented by the registry; abstracted so the binder can be driven
/// directly in tests.
pub trait ShapeSource {
    /// Look up a declared shape
    fn shape(&self, type_name: &str) -> Option<Arc<RecordShape>>;
}

/// Binds declared shapes into path-bound schemas
pub struct SchemaBinder<'a> {
    shapes: &'a dyn ShapeSource,
}

impl<'a> SchemaBinder<'a> {
    /// Create a binder over a shape source
    pub fn new(shapes: &'a dyn ShapeSource) -> Self {
        Self { shapes }
    }

    /// Bind the named shape into a [`BoundSchema`]
    pub fn bind(&self, type_name: &str) -> Result<Arc<BoundSchema>> {
        self.bind_inner(type_name, &mut Vec::new())
    }

    fn bind_inner(&self, type_name: &str, stack: &mut Vec<String>) -> Result<Arc<BoundSchema>> {
        if stack.iter().any(|name| name == type_name) {
            return Err(Error::Configuration(format!(
                "cyclic record type graph: {} -> {}",
                stack.join(" -> "),
                type_name
            )));
        }
        stack.push(type_name.to_string());

        let fields = self.resolve_fields(type_name)?;
        let mut bound = Vec::with_capacity(fields.len());
        for def in &fields {
            bound.push(Arc::new(self.bind_field(&def.name, &def.field_type, false, stack)?));
        }

        stack.pop();
        Ok(Arc::new(BoundSchema {
            type_name: type_name.to_string(),
            fields: bound,
        }))
    }

    /// Resolve the inheritance chain into one flat, ordered field list
    ///
    /// Parent fields come first in their own order; a re-declared name
    /// replaces the inherited definition in place, new names append.
    fn resolve_fields(&self, type_name: &str) -> Result<Vec<FieldDef>> {
        let mut chain: Vec<Arc<RecordShape>> = Vec::new();
        let mut current = Some(type_name.to_string());
        while let Some(name) = current {
            if chain.iter().any(|s| s.type_name() == name) {
                return Err(Error::Configuration(format!(
                    "cyclic inheritance chain through '{}'",
                    name
                )));
            }
            let shape = self.shapes.shape(&name).ok_or_else(|| {
                Error::Configuration(format!("record type '{}' is not registered", name))
            })?;
            current = shape.extends().map(str::to_string);
            chain.push(shape);
        }

        // Walk ancestors first so later declarations override earlier ones
        let mut resolved: Vec<FieldDef> = Vec::new();
        for shape in chain.iter().rev() {
            let mut seen_in_shape: Vec<&str> = Vec::new();
            for def in shape.fields() {
                if seen_in_shape.contains(&def.name.as_str()) {
                    return Err(Error::Configuration(format!(
                        "duplicate field '{}' in record type '{}'",
                        def.name,
                        shape.type_name()
                    )));
                }
                seen_in_shape.push(&def.name);
                match resolved.iter_mut().find(|f| f.name == def.name) {
                    Some(existing) => *existing = def.clone(),
                    None => resolved.push(def.clone()),
                }
            }
        }
        Ok(resolved)
    }

    fn bind_field(
        &self,
        field_name: &str,
        field_type: &FieldType,
        nullable: bool,
        stack: &mut Vec<String>,
    ) -> Result<PathBinding> {
        let kind = match field_type {
            FieldType::Scalar(kind) => BindingKind::Scalar(*kind),
            FieldType::Opaque => BindingKind::Opaque,
            FieldType::Optional(inner) => {
                return self.bind_field(field_name, inner, true, stack);
            }
            FieldType::List(element) => {
                BindingKind::List(Arc::new(self.bind_field("", element, false, stack)?))
            }
            FieldType::Map(element) => {
                BindingKind::Map(Arc::new(self.bind_field("", element, false, stack)?))
            }
            FieldType::Record(nested) => BindingKind::Record(self.bind_inner(nested, stack)?),
        };
        Ok(PathBinding {
            name: field_name.to_string(),
            kind,
            nullable,
        })
    }
}
