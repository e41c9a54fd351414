//! SQL shared by the read handle and write transactions.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{IndexError, IndexStats, NewTorrentFile, RejectedRecord, TorrentFileRecord, TorrentRecord};
use crate::tree::NodeId;

pub(super) const SCHEMA: &str = r#"
    -- Entries mirrored into the tree
    CREATE TABLE IF NOT EXISTS torrents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        remote_id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        added_at TEXT NOT NULL
    );

    -- Selected files, one tree node each
    CREATE TABLE IF NOT EXISTS torrent_files (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        torrent_id INTEGER NOT NULL REFERENCES torrents(id),
        path TEXT NOT NULL,
        size_bytes INTEGER NOT NULL,
        link TEXT NOT NULL,
        file_index INTEGER NOT NULL,
        node_id INTEGER NOT NULL UNIQUE,
        UNIQUE(torrent_id, file_index)
    );

    CREATE INDEX IF NOT EXISTS idx_torrent_files_torrent ON torrent_files(torrent_id);

    -- Entries that can never be mirrored
    CREATE TABLE IF NOT EXISTS rejected_torrents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        remote_id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        reason TEXT NOT NULL,
        rejected_at TEXT NOT NULL
    );
"#;

const FILE_COLUMNS: &str = "id, torrent_id, path, size_bytes, link, file_index, node_id";

pub(super) fn db_err(e: rusqlite::Error) -> IndexError {
    IndexError::Database(e.to_string())
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_torrent(row: &rusqlite::Row) -> rusqlite::Result<TorrentRecord> {
    let added_at: String = row.get(3)?;
    Ok(TorrentRecord {
        id: row.get(0)?,
        remote_id: row.get(1)?,
        name: row.get(2)?,
        added_at: parse_timestamp(&added_at),
    })
}

fn row_to_file(row: &rusqlite::Row) -> rusqlite::Result<TorrentFileRecord> {
    Ok(TorrentFileRecord {
        id: row.get(0)?,
        torrent_id: row.get(1)?,
        path: row.get(2)?,
        size_bytes: row.get(3)?,
        link: row.get(4)?,
        file_index: row.get(5)?,
        node_id: row.get(6)?,
    })
}

fn row_to_rejected(row: &rusqlite::Row) -> rusqlite::Result<RejectedRecord> {
    let rejected_at: String = row.get(4)?;
    Ok(RejectedRecord {
        id: row.get(0)?,
        remote_id: row.get(1)?,
        name: row.get(2)?,
        reason: row.get(3)?,
        rejected_at: parse_timestamp(&rejected_at),
    })
}

fn collect<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
) -> Result<Vec<T>, IndexError> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(db_err)?);
    }
    Ok(out)
}

pub(super) fn insert_torrent(
    conn: &Connection,
    remote_id: &str,
    name: &str,
) -> Result<TorrentRecord, IndexError> {
    let added_at = Utc::now();
    conn.execute(
        "INSERT INTO torrents (remote_id, name, added_at) VALUES (?, ?, ?)",
        params![remote_id, name, added_at.to_rfc3339()],
    )
    .map_err(db_err)?;

    Ok(TorrentRecord {
        id: conn.last_insert_rowid(),
        remote_id: remote_id.to_string(),
        name: name.to_string(),
        added_at,
    })
}

pub(super) fn insert_file(
    conn: &Connection,
    file: &NewTorrentFile<'_>,
) -> Result<TorrentFileRecord, IndexError> {
    conn.execute(
        "INSERT INTO torrent_files (torrent_id, path, size_bytes, link, file_index, node_id)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            file.torrent_id,
            file.path,
            file.size_bytes as i64,
            file.link,
            file.file_index,
            file.node_id
        ],
    )
    .map_err(db_err)?;

    Ok(TorrentFileRecord {
        id: conn.last_insert_rowid(),
        torrent_id: file.torrent_id,
        path: file.path.to_string(),
        size_bytes: file.size_bytes,
        link: file.link.to_string(),
        file_index: file.file_index,
        node_id: file.node_id,
    })
}

pub(super) fn insert_rejected(
    conn: &Connection,
    remote_id: &str,
    name: &str,
    reason: &str,
) -> Result<RejectedRecord, IndexError> {
    let rejected_at = Utc::now();
    conn.execute(
        "INSERT INTO rejected_torrents (remote_id, name, reason, rejected_at) VALUES (?, ?, ?, ?)",
        params![remote_id, name, reason, rejected_at.to_rfc3339()],
    )
    .map_err(db_err)?;

    Ok(RejectedRecord {
        id: conn.last_insert_rowid(),
        remote_id: remote_id.to_string(),
        name: name.to_string(),
        reason: reason.to_string(),
        rejected_at,
    })
}

pub(super) fn torrents(conn: &Connection) -> Result<Vec<TorrentRecord>, IndexError> {
    let mut stmt = conn
        .prepare("SELECT id, remote_id, name, added_at FROM torrents ORDER BY id")
        .map_err(db_err)?;
    let rows = stmt.query_map([], row_to_torrent).map_err(db_err)?;
    collect(rows)
}

pub(super) fn torrent_by_remote_id(
    conn: &Connection,
    remote_id: &str,
) -> Result<Option<TorrentRecord>, IndexError> {
    conn.query_row(
        "SELECT id, remote_id, name, added_at FROM torrents WHERE remote_id = ?",
        params![remote_id],
        row_to_torrent,
    )
    .optional()
    .map_err(db_err)
}

pub(super) fn torrent_by_id(
    conn: &Connection,
    id: i64,
) -> Result<Option<TorrentRecord>, IndexError> {
    conn.query_row(
        "SELECT id, remote_id, name, added_at FROM torrents WHERE id = ?",
        params![id],
        row_to_torrent,
    )
    .optional()
    .map_err(db_err)
}

fn remote_ids(conn: &Connection, sql: &str) -> Result<HashSet<String>, IndexError> {
    let mut stmt = conn.prepare(sql).map_err(db_err)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(db_err)?;
    Ok(collect(rows)?.into_iter().collect())
}

pub(super) fn torrent_remote_ids(conn: &Connection) -> Result<HashSet<String>, IndexError> {
    remote_ids(conn, "SELECT remote_id FROM torrents")
}

pub(super) fn rejected_remote_ids(conn: &Connection) -> Result<HashSet<String>, IndexError> {
    remote_ids(conn, "SELECT remote_id FROM rejected_torrents")
}

pub(super) fn is_rejected(conn: &Connection, remote_id: &str) -> Result<bool, IndexError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM rejected_torrents WHERE remote_id = ?",
            params![remote_id],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_err)?;
    Ok(found.is_some())
}

pub(super) fn rejected(conn: &Connection) -> Result<Vec<RejectedRecord>, IndexError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, remote_id, name, reason, rejected_at FROM rejected_torrents ORDER BY id",
        )
        .map_err(db_err)?;
    let rows = stmt.query_map([], row_to_rejected).map_err(db_err)?;
    collect(rows)
}

pub(super) fn files_for_torrent(
    conn: &Connection,
    torrent_id: i64,
) -> Result<Vec<TorrentFileRecord>, IndexError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM torrent_files WHERE torrent_id = ? ORDER BY file_index",
            FILE_COLUMNS
        ))
        .map_err(db_err)?;
    let rows = stmt
        .query_map(params![torrent_id], row_to_file)
        .map_err(db_err)?;
    collect(rows)
}

pub(super) fn file_by_node(
    conn: &Connection,
    node_id: NodeId,
) -> Result<Option<TorrentFileRecord>, IndexError> {
    conn.query_row(
        &format!("SELECT {} FROM torrent_files WHERE node_id = ?", FILE_COLUMNS),
        params![node_id],
        row_to_file,
    )
    .optional()
    .map_err(db_err)
}

pub(super) fn count_files(conn: &Connection, torrent_id: i64) -> Result<u64, IndexError> {
    conn.query_row(
        "SELECT COUNT(*) FROM torrent_files WHERE torrent_id = ?",
        params![torrent_id],
        |row| row.get(0),
    )
    .map_err(db_err)
}

pub(super) fn delete_file(conn: &Connection, id: i64) -> Result<(), IndexError> {
    conn.execute("DELETE FROM torrent_files WHERE id = ?", params![id])
        .map_err(db_err)?;
    Ok(())
}

pub(super) fn delete_torrent(conn: &Connection, id: i64) -> Result<(), IndexError> {
    conn.execute("DELETE FROM torrents WHERE id = ?", params![id])
        .map_err(db_err)?;
    Ok(())
}

pub(super) fn stats(conn: &Connection) -> Result<IndexStats, IndexError> {
    let (torrents, files, total_bytes): (u64, u64, i64) = conn
        .query_row(
            "SELECT
                (SELECT COUNT(*) FROM torrents),
                (SELECT COUNT(*) FROM torrent_files),
                (SELECT COALESCE(SUM(size_bytes), 0) FROM torrent_files)",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .map_err(db_err)?;

    let rejected: u64 = conn
        .query_row("SELECT COUNT(*) FROM rejected_torrents", [], |row| row.get(0))
        .map_err(db_err)?;

    Ok(IndexStats {
        torrents,
        files,
        rejected,
        total_bytes: total_bytes.max(0) as u64,
    })
}
