//! Reconciliation engine.
//!
//! Keeps three independently mutable stores converging: the origin's
//! catalog, the relational index, and the virtual file tree. The
//! `Reconciler` runs passes; `Ingestor` and `Teardown` apply one entry's
//! worth of changes inside a savepoint.

mod ingest;
mod reconciler;
mod teardown;
mod types;

pub use ingest::{container_name, rejection_reason, Ingestor};
pub use reconciler::Reconciler;
pub use teardown::Teardown;
pub use types::*;
