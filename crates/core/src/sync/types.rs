//! Types for reconciliation, ingestion and teardown.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::index::IndexError;
use crate::origin::OriginError;
use crate::tree::TreeError;

/// Errors raised while mirroring a catalog entry.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    #[error("Origin error: {0}")]
    Origin(#[from] OriginError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    /// Every file of the entry maps onto nodes owned by other entries.
    #[error("All {files} files of {remote_id} are already bound to other entries in {container}")]
    NameCollision {
        remote_id: String,
        container: String,
        files: usize,
    },
}

/// Result of ingesting one catalog entry.
#[derive(Debug)]
pub enum IngestOutcome {
    /// The entry is mirrored. `skipped` counts files that were already bound.
    Ingested {
        torrent_id: i64,
        files: usize,
        skipped: usize,
    },
    /// The entry can never be mirrored and must be recorded as rejected.
    Rejected { reason: String },
    /// Ingestion failed; the caller rolls back the entry and retries next pass.
    Failed(SyncError),
}

/// Whether teardown also deletes the entry on the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownMode {
    /// The remote entry is already gone; only local state is removed.
    LocalOnly,
    /// Local state is removed, then the remote entry is deleted (best effort).
    RemoteEffecting,
}

/// What a teardown removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub file_records: usize,
    pub file_nodes: usize,
    pub directories: usize,
    pub remote_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_error: Option<String>,
}

/// What caused a reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Startup,
    ContentChange,
    Interval,
    Manual,
}

impl TriggerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSource::Startup => "startup",
            TriggerSource::ContentChange => "content_change",
            TriggerSource::Interval => "interval",
            TriggerSource::Manual => "manual",
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub trigger: TriggerSource,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    /// Entries returned by the origin (any status).
    pub catalog_size: usize,
    /// Entries that were ready to be mirrored.
    pub ready_entries: usize,
    pub ingested: usize,
    pub rejected: usize,
    pub failed: usize,
    pub removed: usize,
    pub orphan_records: usize,
    pub orphan_torrents: usize,
    /// Set when the catalog could not be fetched and no phase ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
    /// Phases that aborted, with their error.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub phase_errors: Vec<String>,
}

impl SyncReport {
    pub fn new(trigger: TriggerSource) -> Self {
        Self {
            trigger,
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: 0,
            catalog_size: 0,
            ready_entries: 0,
            ingested: 0,
            rejected: 0,
            failed: 0,
            removed: 0,
            orphan_records: 0,
            orphan_torrents: 0,
            aborted: None,
            phase_errors: Vec::new(),
        }
    }

    /// Whether every phase ran to completion.
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none() && self.phase_errors.is_empty()
    }
}

/// Current reconciler state.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcilerStatus {
    pub running: bool,
    pub passes: u64,
    pub dropped_triggers: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_report: Option<SyncReport>,
}
