//! Testing utilities and mock implementations.
//!
//! This module provides a mock remote origin and a failure-injecting file
//! tree, allowing reconciliation to be tested without a real debrid account.
//!
//! # Example
//!
//! ```rust,ignore
//! use debridfs_core::testing::{fixtures, FlakyTree, MockOrigin};
//!
//! let origin = MockOrigin::new();
//! origin.add_entry(
//!     fixtures::ready_entry("abc123", "Movie.mkv", 1_500_000_000),
//!     fixtures::single_file_detail("abc123", "/Movie.mkv", 1_500_000_000),
//! ).await;
//!
//! let tree = FlakyTree::new()?;
//! tree.fail_file("Movie.mkv");
//! ```

mod flaky_tree;
mod mock_origin;

pub use flaky_tree::FlakyTree;
pub use mock_origin::MockOrigin;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::config::{DirectoryNaming, LibraryConfig};
    use crate::origin::{CatalogEntry, EntryDetail, EntryFile};

    /// Content type used by fixtures.
    pub const CONTENT_TYPE: &str = "application/x-debrid-stream";

    /// Library root used by fixtures.
    pub const LIBRARY_ROOT: &str = "debrid";

    /// A catalog entry that is ready to be mirrored.
    pub fn ready_entry(id: &str, filename: &str, bytes: u64) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            filename: filename.to_string(),
            status: "downloaded".to_string(),
            bytes,
        }
    }

    /// A catalog entry still being processed by the origin.
    pub fn pending_entry(id: &str, filename: &str) -> CatalogEntry {
        CatalogEntry {
            id: id.to_string(),
            filename: filename.to_string(),
            status: "downloading".to_string(),
            bytes: 0,
        }
    }

    /// Direct link used for the `index`-th selected file of an entry.
    pub fn link(id: &str, index: usize) -> String {
        format!("https://real-debrid.com/d/{}-{}", id, index)
    }

    /// Detail with one selected file and one link.
    pub fn single_file_detail(id: &str, path: &str, bytes: u64) -> EntryDetail {
        detail(id, &[(path, bytes, true)], 1)
    }

    /// Detail with the given `(path, bytes, selected)` files and `links` links.
    pub fn detail(id: &str, files: &[(&str, u64, bool)], links: usize) -> EntryDetail {
        EntryDetail {
            id: id.to_string(),
            filename: id.to_string(),
            files: files
                .iter()
                .map(|(path, bytes, selected)| EntryFile {
                    path: path.to_string(),
                    bytes: *bytes,
                    selected: *selected,
                })
                .collect(),
            links: (0..links).map(|i| link(id, i)).collect(),
        }
    }

    /// Library configuration with id-based container names.
    pub fn library_config() -> LibraryConfig {
        library_config_with(DirectoryNaming::Id)
    }

    /// Library configuration with the given naming policy.
    pub fn library_config_with(naming: DirectoryNaming) -> LibraryConfig {
        LibraryConfig {
            root_dir: LIBRARY_ROOT.to_string(),
            naming,
            content_type: CONTENT_TYPE.to_string(),
        }
    }
}
