//! Declared record shapes
//!
//! A [`RecordShape`] is the ahead-of-time declaration of a record type: an
//! ordered list of named fields, each with a [`FieldType`]. Shapes are plain
//! data; the binder (see [`crate::binder`]) turns them into path-bound
//! schemas. A shape may extend another registered shape, in which case the
//! subtype re-declares or appends fields.
//!
//! The type system is closed: every declared field is a scalar, a container,
//! a nested record reference, an optional wrapper, or the explicit opaque
//! kind. There is no "unrecognized" type that could be silently dropped —
//! callers who need an escape hatch declare [`FieldType::Opaque`] and own the
//! payload encoding.

use docbind_core::ScalarKind;
use serde::{Deserialize, Serialize};

/// Declared type of one record field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
    /// A natively supported scalar kind
    Scalar(ScalarKind),
    /// Ordered list of elements
    List(Box<FieldType>),
    /// String-keyed map of elements
    Map(Box<FieldType>),
    /// Nested record, referenced by registered type name
    Record(String),
    /// Nullable wrapper, transparent for binding
    Optional(Box<FieldType>),
    /// Explicit opaque payload (binary-safe codec)
    Opaque,
}

impl FieldType {
    /// String scalar
    pub fn string() -> Self {
        FieldType::Scalar(ScalarKind::String)
    }

    /// Integer scalar
    pub fn integer() -> Self {
        FieldType::Scalar(ScalarKind::Integer)
    }

    /// Float scalar
    pub fn float() -> Self {
        FieldType::Scalar(ScalarKind::Float)
    }

    /// Boolean scalar
    pub fn boolean() -> Self {
        FieldType::Scalar(ScalarKind::Boolean)
    }

    /// Byte-string scalar
    pub fn bytes() -> Self {
        FieldType::Scalar(ScalarKind::Bytes)
    }

    /// Timestamp scalar
    pub fn timestamp() -> Self {
        FieldType::Scalar(ScalarKind::Timestamp)
    }

    /// List of `element`
    pub fn list(element: FieldType) -> Self {
        FieldType::List(Box::new(element))
    }

    /// Map of string keys to `element`
    pub fn map(element: FieldType) -> Self {
        FieldType::Map(Box::new(element))
    }

    /// Nested record by registered type name
    pub fn record(type_name: impl Into<String>) -> Self {
        FieldType::Record(type_name.into())
    }

    /// Nullable wrapper
    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional(Box::new(inner))
    }
}

/// One declared field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name, unique within the shape
    pub name: String,
    /// Declared type
    pub field_type: FieldType,
}

/// Declared shape of a record type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordShape {
    type_name: String,
    extends: Option<String>,
    fields: Vec<FieldDef>,
}

impl RecordShape {
    /// Start building a shape for `type_name`
    pub fn builder(type_name: impl Into<String>) -> RecordShapeBuilder {
        RecordShapeBuilder {
            type_name: type_name.into(),
            extends: None,
            fields: Vec::new(),
        }
    }

    /// The declared type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The parent type this shape extends, if any
    pub fn extends(&self) -> Option<&str> {
        self.extends.as_deref()
    }

    /// The declared fields, in declaration order
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }
}

/// Builder for [`RecordShape`]
pub struct RecordShapeBuilder {
    type_name: String,
    extends: Option<String>,
    fields: Vec<FieldDef>,
}

impl RecordShapeBuilder {
    /// Inherit the fields of a previously registered shape
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    /// Declare a field
    pub fn field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            field_type,
        });
        self
    }

    /// Finish the shape
    pub fn build(self) -> RecordShape {
        RecordShape {
            type_name: self.type_name,
            extends: self.extends,
            fields: self.fields,
        }
    }
}
