//! Types for stream resolution.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::index::IndexError;
use crate::origin::OriginError;
use crate::tree::{NodeId, TreeError};

/// Errors from resolving a node.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Origin error: {0}")]
    Origin(#[from] OriginError),
}

/// Metadata of a remotely backed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub node_id: NodeId,
    pub name: String,
    pub size_bytes: u64,
    pub content_type: String,
}

/// A short-lived download URL for a remotely backed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamUrl {
    pub node_id: NodeId,
    pub url: String,
    pub filename: String,
    pub size_bytes: u64,
}
