//! docbind-record: live records and proxy containers
//!
//! Builds on the bound schemas of `docbind-schema` and the store boundary of
//! `docbind-store`: a [`Record`] holds one path-bound proxy per field
//! ([`ScalarProxy`], [`ListProxy`], [`MapProxy`], nested [`Record`]s), the
//! [`AtomicOps`] engine runs the race-free compound pops, and the top-level
//! record operations (save/load/get/delete/duplicate, pipeline scopes) tie it
//! together.

pub mod atomic;
pub mod handle;
pub mod proxy;
pub mod record;

pub use atomic::AtomicOps;
pub use handle::{RecordHandle, StoreContext};
pub use proxy::{BindState, FieldProxy, ListProxy, MapProxy, ScalarProxy};
pub use record::{PipelineOptions, Record};
