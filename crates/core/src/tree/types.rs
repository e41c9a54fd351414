//! Types for the virtual file tree.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a tree node.
pub type NodeId = i64;

/// Errors from file tree operations.
#[derive(Debug, Clone, Error)]
pub enum TreeError {
    #[error("Node not found: {0}")]
    NotFound(NodeId),

    #[error("Directory not empty: {0}")]
    NotEmpty(NodeId),

    #[error("Node is not a directory: {0}")]
    NotADirectory(NodeId),

    #[error("Node is not a file: {0}")]
    NotAFile(NodeId),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl TreeError {
    /// Whether the error means the target node no longer exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TreeError::NotFound(_))
    }
}

/// Kind of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Directory,
    File,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Directory => "directory",
            NodeKind::File => "file",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "directory" => Some(NodeKind::Directory),
            "file" => Some(NodeKind::File),
            _ => None,
        }
    }
}

/// A node of the virtual file tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: NodeId,
    /// Parent directory. `None` only for the tree root.
    pub parent_id: Option<NodeId>,
    pub name: String,
    pub kind: NodeKind,
    /// Content type tag (files only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl TreeNode {
    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }
}
