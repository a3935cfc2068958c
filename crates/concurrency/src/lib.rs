//! docbind-concurrency: cross-process coordination
//!
//! Two independent, composable mechanisms over the document store:
//! [`Lock`], a time-limited token-based mutual-exclusion marker, and
//! [`PipelineBatch`], deferred path writes flushed as one atomic commit.

pub mod lock;
pub mod pipeline;

pub use lock::Lock;
pub use pipeline::PipelineBatch;
