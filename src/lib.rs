//! docbind — typed records transparently backed by a remote JSON document
//! store
//!
//! Each field of a registered record type — scalar, list, map, or nested
//! record — is individually addressable by a stable path inside one remote
//! document and can be read, mutated, or atomically removed without
//! re-serializing the whole document.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use docbind::{
//!     FieldType, FieldValue, MemoryStore, Record, RecordShape, SchemaRegistry, StoreContext,
//! };
//!
//! # fn main() -> docbind::Result<()> {
//! // Declare and register the record type once
//! let registry = SchemaRegistry::new();
//! registry.register(
//!     RecordShape::builder("customer")
//!         .field("name", FieldType::string())
//!         .field("tags", FieldType::list(FieldType::string()))
//!         .build(),
//! )?;
//!
//! // Bind a record to a store and mutate fields individually
//! let ctx = StoreContext::new(Arc::new(MemoryStore::new()));
//! let mut customer = Record::create(&registry, "customer", &ctx)?;
//! customer.scalar_mut("name")?.set(FieldValue::from("Alice"), None)?;
//! customer.list_mut("tags")?.push(FieldValue::from("vip"), None)?;
//! customer.save(None)?;
//!
//! // Fetch it back by external key
//! let loaded = Record::get(&registry, &ctx, &customer.external_key())?;
//! assert_eq!(loaded.field("name")?.detach(), FieldValue::from("Alice"));
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - `docbind-schema` turns declared shapes into path-binding trees, once
//!   per registered type.
//! - `docbind-record` binds live proxies to a record identity and mediates
//!   all reads and writes, including the atomic compound pops.
//! - `docbind-concurrency` layers the distributed lock and pipeline batching
//!   on top.
//! - `docbind-store` is the remote command boundary, with an in-memory
//!   reference implementation.

pub use docbind_concurrency::{Lock, PipelineBatch};
pub use docbind_core::{
    codec_for, opaque_codec, DocPath, Error, FieldValue, PathSegment, RecordKey, Result,
    ScalarCodec, ScalarKind,
};
pub use docbind_record::{
    AtomicOps, BindState, FieldProxy, ListProxy, MapProxy, PipelineOptions, Record, RecordHandle,
    ScalarProxy, StoreContext,
};
pub use docbind_schema::{
    BindingKind, BoundSchema, FieldDef, FieldType, PathBinding, RecordShape, SchemaRegistry,
};
pub use docbind_store::{DocumentStore, EvalScript, MemoryStore, WireValue};
