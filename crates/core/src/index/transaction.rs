//! Write transactions with nested savepoints.

use std::collections::HashSet;

use rusqlite::Connection;
use tracing::warn;

use super::queries::{self, db_err};
use super::{IndexError, NewTorrentFile, RejectedRecord, TorrentFileRecord, TorrentRecord};
use crate::tree::NodeId;

/// An open write transaction.
///
/// Dropping an unfinished transaction rolls it back.
pub struct IndexTx {
    conn: Connection,
    finished: bool,
}

impl IndexTx {
    pub(super) fn begin(conn: Connection) -> Result<Self, IndexError> {
        conn.execute_batch("BEGIN IMMEDIATE").map_err(db_err)?;
        Ok(Self {
            conn,
            finished: false,
        })
    }

    /// Open a savepoint.
    pub fn savepoint(&mut self, name: &str) -> Result<(), IndexError> {
        check_savepoint_name(name)?;
        self.conn
            .execute_batch(&format!("SAVEPOINT {}", name))
            .map_err(db_err)
    }

    /// Keep the changes made since the savepoint.
    pub fn release(&mut self, name: &str) -> Result<(), IndexError> {
        check_savepoint_name(name)?;
        self.conn
            .execute_batch(&format!("RELEASE SAVEPOINT {}", name))
            .map_err(db_err)
    }

    /// Discard the changes made since the savepoint and close it.
    pub fn rollback_to(&mut self, name: &str) -> Result<(), IndexError> {
        check_savepoint_name(name)?;
        self.conn
            .execute_batch(&format!(
                "ROLLBACK TO SAVEPOINT {name}; RELEASE SAVEPOINT {name}"
            ))
            .map_err(db_err)
    }

    /// Commit the transaction.
    pub fn commit(mut self) -> Result<(), IndexError> {
        self.finished = true;
        if let Err(e) = self.conn.execute_batch("COMMIT") {
            // A failed COMMIT can leave the transaction open
            let _ = self.conn.execute_batch("ROLLBACK");
            return Err(db_err(e));
        }
        Ok(())
    }

    /// Roll back the whole transaction.
    pub fn rollback(mut self) -> Result<(), IndexError> {
        self.finished = true;
        self.conn.execute_batch("ROLLBACK").map_err(db_err)
    }

    pub fn insert_torrent(&self, remote_id: &str, name: &str) -> Result<TorrentRecord, IndexError> {
        queries::insert_torrent(&self.conn, remote_id, name)
    }

    pub fn insert_file(&self, file: &NewTorrentFile<'_>) -> Result<TorrentFileRecord, IndexError> {
        queries::insert_file(&self.conn, file)
    }

    pub fn insert_rejected(
        &self,
        remote_id: &str,
        name: &str,
        reason: &str,
    ) -> Result<RejectedRecord, IndexError> {
        queries::insert_rejected(&self.conn, remote_id, name, reason)
    }

    pub fn torrents(&self) -> Result<Vec<TorrentRecord>, IndexError> {
        queries::torrents(&self.conn)
    }

    pub fn torrent(&self, remote_id: &str) -> Result<Option<TorrentRecord>, IndexError> {
        queries::torrent_by_remote_id(&self.conn, remote_id)
    }

    pub fn torrent_by_id(&self, id: i64) -> Result<Option<TorrentRecord>, IndexError> {
        queries::torrent_by_id(&self.conn, id)
    }

    /// Remote ids of every ingested torrent.
    pub fn torrent_remote_ids(&self) -> Result<HashSet<String>, IndexError> {
        queries::torrent_remote_ids(&self.conn)
    }

    /// Remote ids of every rejected entry.
    pub fn rejected_remote_ids(&self) -> Result<HashSet<String>, IndexError> {
        queries::rejected_remote_ids(&self.conn)
    }

    pub fn is_rejected(&self, remote_id: &str) -> Result<bool, IndexError> {
        queries::is_rejected(&self.conn, remote_id)
    }

    pub fn files_for_torrent(&self, torrent_id: i64) -> Result<Vec<TorrentFileRecord>, IndexError> {
        queries::files_for_torrent(&self.conn, torrent_id)
    }

    pub fn file_by_node(&self, node_id: NodeId) -> Result<Option<TorrentFileRecord>, IndexError> {
        queries::file_by_node(&self.conn, node_id)
    }

    pub fn count_files(&self, torrent_id: i64) -> Result<u64, IndexError> {
        queries::count_files(&self.conn, torrent_id)
    }

    pub fn delete_file(&self, id: i64) -> Result<(), IndexError> {
        queries::delete_file(&self.conn, id)
    }

    pub fn delete_torrent(&self, id: i64) -> Result<(), IndexError> {
        queries::delete_torrent(&self.conn, id)
    }
}

impl Drop for IndexTx {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!("Failed to roll back abandoned index transaction: {}", e);
            }
        }
    }
}

fn check_savepoint_name(name: &str) -> Result<(), IndexError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(IndexError::InvalidSavepoint(name.to_string()))
    }
}
