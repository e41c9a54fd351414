//! Virtual file tree exposed to mount clients.
//!
//! The reconciler only touches the tree through the `FileTree` trait. Node
//! persistence belongs to the implementation; `SqliteTree` is the one the
//! daemon ships with.

mod sqlite;
mod types;

pub use sqlite::SqliteTree;
pub use types::*;

/// Trait for file tree storage.
pub trait FileTree: Send + Sync {
    /// Get the root directory.
    fn root(&self) -> Result<TreeNode, TreeError>;

    /// Get the directory called `name` under `parent`, creating it if missing.
    fn find_or_create_directory(&self, name: &str, parent: NodeId)
        -> Result<TreeNode, TreeError>;

    /// Get the file called `name` under `parent`, creating it with the
    /// given content type if missing.
    fn find_or_create_file(
        &self,
        name: &str,
        parent: NodeId,
        content_type: &str,
    ) -> Result<TreeNode, TreeError>;

    /// Open a node by id. Returns `None` when the node does not exist.
    fn open(&self, id: NodeId) -> Result<Option<TreeNode>, TreeError>;

    /// Delete a file node.
    fn delete_file(&self, id: NodeId) -> Result<(), TreeError>;

    /// Delete a directory. Fails with `NotEmpty` if it still has children.
    fn delete_directory(&self, id: NodeId) -> Result<(), TreeError>;

    /// List the direct children of a directory.
    fn list_children(&self, dir: NodeId) -> Result<Vec<TreeNode>, TreeError>;
}

/// Find or create the directory holding all mirrored content.
pub fn library_root(tree: &dyn FileTree, name: &str) -> Result<TreeNode, TreeError> {
    let root = tree.root()?;
    tree.find_or_create_directory(name, root.id)
}
