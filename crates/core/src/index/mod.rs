//! Relational index of mirrored entries.
//!
//! Three record kinds live here: ingested torrents, their file records (each
//! bound to a tree node), and permanently rejected entries. Writers work in
//! an `IndexTx` with savepoints; readers use `SqliteIndex` directly and see
//! committed state only.

mod queries;
mod sqlite;
mod transaction;
mod types;

pub use sqlite::SqliteIndex;
pub use transaction::IndexTx;
pub use types::*;
