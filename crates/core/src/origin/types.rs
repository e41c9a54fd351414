//! Types shared by remote origin implementations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status reported by the origin once every byte of an entry is cached.
pub const READY_STATUS: &str = "downloaded";

/// Errors from remote origin operations.
#[derive(Debug, Clone, Error)]
pub enum OriginError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout")]
    Timeout,
}

/// One entry of the remote catalog listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Remote identifier.
    pub id: String,
    /// Display name.
    pub filename: String,
    /// Remote processing status (e.g., "downloaded", "queued").
    pub status: String,
    /// Total size of the selected files in bytes.
    pub bytes: u64,
}

impl CatalogEntry {
    /// Whether the entry is fully available on the origin and has content.
    pub fn is_ready(&self) -> bool {
        self.status == READY_STATUS && self.bytes > 0
    }
}

/// A file inside a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFile {
    /// Path relative to the entry, with a leading separator (e.g., "/Movie.mkv").
    pub path: String,
    pub bytes: u64,
    /// Whether the file was selected for download on the origin.
    pub selected: bool,
}

/// Full detail of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDetail {
    pub id: String,
    pub filename: String,
    /// Every file of the entry, in catalog order.
    pub files: Vec<EntryFile>,
    /// One direct link per selected file, in the same order as the selected files.
    pub links: Vec<String>,
}

impl EntryDetail {
    /// Selected files paired with their position in the full file list.
    pub fn selected_files(&self) -> Vec<(usize, &EntryFile)> {
        self.files
            .iter()
            .enumerate()
            .filter(|(_, file)| file.selected)
            .collect()
    }
}

/// One page of the catalog listing.
#[derive(Debug, Clone, Default)]
pub struct CatalogPage {
    pub entries: Vec<CatalogEntry>,
    /// Total number of entries across all pages, when the origin reports it.
    pub total: Option<u64>,
}

/// Result of exchanging a stored link for a playable one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnrestrictedLink {
    /// Short-lived download URL.
    pub download: String,
    pub filename: String,
    pub filesize: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}
