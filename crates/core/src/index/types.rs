//! Types for the relational index of mirrored entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tree::NodeId;

/// Errors from index operations.
#[derive(Debug, Clone, Error)]
pub enum IndexError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid savepoint name: {0}")]
    InvalidSavepoint(String),
}

/// A remote entry that was ingested into the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentRecord {
    pub id: i64,
    /// Identifier on the origin.
    pub remote_id: String,
    pub name: String,
    pub added_at: DateTime<Utc>,
}

/// A selected file of an ingested entry, bound to its tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentFileRecord {
    pub id: i64,
    pub torrent_id: i64,
    /// Path inside the entry as reported by the origin.
    pub path: String,
    pub size_bytes: u64,
    /// Direct link that is unrestricted at playback time.
    pub link: String,
    /// Position of the file in the entry's full file list.
    pub file_index: u32,
    pub node_id: NodeId,
}

/// Values for inserting a new file record.
#[derive(Debug, Clone)]
pub struct NewTorrentFile<'a> {
    pub torrent_id: i64,
    pub path: &'a str,
    pub size_bytes: u64,
    pub link: &'a str,
    pub file_index: u32,
    pub node_id: NodeId,
}

/// A remote entry that can never be mirrored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub id: i64,
    pub remote_id: String,
    pub name: String,
    pub reason: String,
    pub rejected_at: DateTime<Utc>,
}

/// Index statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub torrents: u64,
    pub files: u64,
    pub rejected: u64,
    pub total_bytes: u64,
}
