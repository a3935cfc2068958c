//! docbind-store: the remote document-store boundary
//!
//! Defines the [`DocumentStore`] command surface this core consumes (sub-path
//! reads/writes, array primitives, atomic [`EvalScript`]s, document lifecycle,
//! the set-if-not-exists lock primitive, and the pipeline's atomic
//! `write_multi`), plus [`MemoryStore`], the in-process reference
//! implementation used by the test suites.

pub mod memory;
pub mod script;
pub mod traits;
pub mod ttl;

pub use memory::MemoryStore;
pub use script::{decode_reply, EvalScript};
pub use traits::{DocumentStore, WireValue};
pub use ttl::ExpiryIndex;
