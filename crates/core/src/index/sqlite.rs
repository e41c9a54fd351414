//! SQLite-backed index.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::Connection;

use super::queries::{self, db_err};
use super::{IndexError, IndexStats, IndexTx, RejectedRecord, TorrentFileRecord, TorrentRecord};
use crate::tree::NodeId;

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed index.
///
/// Holds one connection for reads. Each transaction opens its own connection
/// so readers are never blocked behind a long reconciliation phase.
pub struct SqliteIndex {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteIndex {
    /// Open the index, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, IndexError> {
        let conn = Self::open_connection(path)?;
        conn.execute_batch(queries::SCHEMA).map_err(db_err)?;
        Ok(Self {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
        })
    }

    fn open_connection(path: &Path) -> Result<Connection, IndexError> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(db_err)?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))
            .map_err(db_err)?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(db_err)?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(db_err)?;
        Ok(conn)
    }

    /// Begin a write transaction on a dedicated connection.
    pub fn begin(&self) -> Result<IndexTx, IndexError> {
        let conn = Self::open_connection(&self.path)?;
        IndexTx::begin(conn)
    }

    /// Get the file record bound to a tree node.
    pub fn file_by_node(&self, node_id: NodeId) -> Result<Option<TorrentFileRecord>, IndexError> {
        let conn = self.conn.lock().unwrap();
        queries::file_by_node(&conn, node_id)
    }

    /// Get an ingested torrent by remote id.
    pub fn torrent(&self, remote_id: &str) -> Result<Option<TorrentRecord>, IndexError> {
        let conn = self.conn.lock().unwrap();
        queries::torrent_by_remote_id(&conn, remote_id)
    }

    /// List all ingested torrents.
    pub fn torrents(&self) -> Result<Vec<TorrentRecord>, IndexError> {
        let conn = self.conn.lock().unwrap();
        queries::torrents(&conn)
    }

    /// List the file records of a torrent.
    pub fn files_for_torrent(&self, torrent_id: i64) -> Result<Vec<TorrentFileRecord>, IndexError> {
        let conn = self.conn.lock().unwrap();
        queries::files_for_torrent(&conn, torrent_id)
    }

    /// List all rejected entries.
    pub fn rejected(&self) -> Result<Vec<RejectedRecord>, IndexError> {
        let conn = self.conn.lock().unwrap();
        queries::rejected(&conn)
    }

    /// Whether the remote id was rejected.
    pub fn is_rejected(&self, remote_id: &str) -> Result<bool, IndexError> {
        let conn = self.conn.lock().unwrap();
        queries::is_rejected(&conn, remote_id)
    }

    /// Get index statistics.
    pub fn stats(&self) -> Result<IndexStats, IndexError> {
        let conn = self.conn.lock().unwrap();
        queries::stats(&conn)
    }
}
