//! Teardown: reversing an ingestion.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::index::{IndexTx, TorrentRecord};
use crate::origin::{OriginError, RemoteOrigin};
use crate::tree::{FileTree, NodeId, TreeError};

use super::{SyncError, TeardownMode, TeardownReport};

/// Removes an ingested entry from the index and the tree.
pub struct Teardown {
    tree: Arc<dyn FileTree>,
    origin: Arc<dyn RemoteOrigin>,
    /// Name of the library root, which is never pruned.
    root_dir: String,
}

impl Teardown {
    pub fn new(tree: Arc<dyn FileTree>, origin: Arc<dyn RemoteOrigin>, root_dir: String) -> Self {
        Self {
            tree,
            origin,
            root_dir,
        }
    }

    /// Tear down one torrent inside the caller's savepoint.
    ///
    /// Index and tree errors are returned so the caller can roll back. A
    /// failed remote delete is only reported.
    pub async fn teardown(
        &self,
        tx: &mut IndexTx,
        torrent: &TorrentRecord,
        mode: TeardownMode,
    ) -> Result<TeardownReport, SyncError> {
        let mut report = self.remove_local(tx, torrent)?;

        if mode == TeardownMode::RemoteEffecting {
            match self.origin.delete_entry(&torrent.remote_id).await {
                Ok(()) => report.remote_deleted = true,
                // Already gone is what we wanted
                Err(OriginError::NotFound(_)) => report.remote_deleted = true,
                Err(e) => {
                    warn!(
                        remote_id = %torrent.remote_id,
                        error = %e,
                        "Failed to delete entry on origin"
                    );
                    report.remote_error = Some(e.to_string());
                }
            }
        }

        info!(
            remote_id = %torrent.remote_id,
            mode = ?mode,
            files = report.file_records,
            directories = report.directories,
            remote_deleted = report.remote_deleted,
            "Tore down entry"
        );

        Ok(report)
    }

    fn remove_local(
        &self,
        tx: &IndexTx,
        torrent: &TorrentRecord,
    ) -> Result<TeardownReport, SyncError> {
        let mut report = TeardownReport::default();

        for record in tx.files_for_torrent(torrent.id)? {
            tx.delete_file(record.id)?;
            report.file_records += 1;

            let node = match self.tree.open(record.node_id)? {
                Some(node) => node,
                None => continue,
            };

            match self.tree.delete_file(node.id) {
                Ok(()) => report.file_nodes += 1,
                Err(TreeError::NotFound(_)) => {}
                Err(e) => return Err(e.into()),
            }

            if let Some(parent) = node.parent_id {
                if self.prune_if_empty(parent) {
                    report.directories += 1;
                }
            }
        }

        tx.delete_torrent(torrent.id)?;
        Ok(report)
    }

    /// Delete `dir` if it has no children left. Best effort.
    fn prune_if_empty(&self, dir: NodeId) -> bool {
        match self.is_prunable(dir) {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                warn!(node_id = dir, error = %e, "Failed to inspect parent directory");
                return false;
            }
        }

        match self.tree.delete_directory(dir) {
            Ok(()) => {
                debug!(node_id = dir, "Pruned empty directory");
                true
            }
            Err(TreeError::NotFound(_)) => false,
            Err(e) => {
                warn!(node_id = dir, error = %e, "Failed to prune empty directory");
                false
            }
        }
    }

    fn is_prunable(&self, dir: NodeId) -> Result<bool, TreeError> {
        let node = match self.tree.open(dir)? {
            Some(node) => node,
            None => return Ok(false),
        };

        let grandparent = match node.parent_id {
            Some(id) => id,
            None => return Ok(false),
        };

        if node.name == self.root_dir && grandparent == self.tree.root()?.id {
            return Ok(false);
        }

        Ok(self.tree.list_children(dir)?.is_empty())
    }
}
