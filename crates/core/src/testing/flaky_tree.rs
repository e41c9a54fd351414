//! File tree wrapper that injects failures.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::tree::{FileTree, NodeId, SqliteTree, TreeError, TreeNode};

/// In-memory `SqliteTree` that fails selected operations on demand.
///
/// Used to simulate a tree store that breaks halfway through ingesting or
/// tearing down an entry.
pub struct FlakyTree {
    inner: SqliteTree,
    /// File names whose creation fails.
    failing_files: Mutex<HashSet<String>>,
    /// Node ids whose `open` fails with a storage error.
    failing_opens: Mutex<HashSet<NodeId>>,
    /// Directories whose deletion fails.
    failing_directory_deletes: Mutex<HashSet<NodeId>>,
}

impl FlakyTree {
    /// Create a flaky tree backed by an in-memory SQLite tree.
    pub fn new() -> Result<Self, TreeError> {
        Ok(Self {
            inner: SqliteTree::in_memory()?,
            failing_files: Mutex::new(HashSet::new()),
            failing_opens: Mutex::new(HashSet::new()),
            failing_directory_deletes: Mutex::new(HashSet::new()),
        })
    }

    /// Make `find_or_create_file` fail for files with this name.
    pub fn fail_file(&self, name: &str) {
        self.failing_files.lock().unwrap().insert(name.to_string());
    }

    /// Make `open` fail for this node.
    pub fn fail_open(&self, id: NodeId) {
        self.failing_opens.lock().unwrap().insert(id);
    }

    /// Make `delete_directory` fail for this node.
    pub fn fail_directory_delete(&self, id: NodeId) {
        self.failing_directory_deletes.lock().unwrap().insert(id);
    }

    /// Remove every injected failure.
    pub fn heal(&self) {
        self.failing_files.lock().unwrap().clear();
        self.failing_opens.lock().unwrap().clear();
        self.failing_directory_deletes.lock().unwrap().clear();
    }

    fn injected() -> TreeError {
        TreeError::Database("injected failure".to_string())
    }
}

impl FileTree for FlakyTree {
    fn root(&self) -> Result<TreeNode, TreeError> {
        self.inner.root()
    }

    fn find_or_create_directory(
        &self,
        name: &str,
        parent: NodeId,
    ) -> Result<TreeNode, TreeError> {
        self.inner.find_or_create_directory(name, parent)
    }

    fn find_or_create_file(
        &self,
        name: &str,
        parent: NodeId,
        content_type: &str,
    ) -> Result<TreeNode, TreeError> {
        if self.failing_files.lock().unwrap().contains(name) {
            return Err(Self::injected());
        }
        self.inner.find_or_create_file(name, parent, content_type)
    }

    fn open(&self, id: NodeId) -> Result<Option<TreeNode>, TreeError> {
        if self.failing_opens.lock().unwrap().contains(&id) {
            return Err(Self::injected());
        }
        self.inner.open(id)
    }

    fn delete_file(&self, id: NodeId) -> Result<(), TreeError> {
        self.inner.delete_file(id)
    }

    fn delete_directory(&self, id: NodeId) -> Result<(), TreeError> {
        if self.failing_directory_deletes.lock().unwrap().contains(&id) {
            return Err(Self::injected());
        }
        self.inner.delete_directory(id)
    }

    fn list_children(&self, dir: NodeId) -> Result<Vec<TreeNode>, TreeError> {
        self.inner.list_children(dir)
    }
}
