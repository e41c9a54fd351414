//! SQLite-backed file tree implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use super::{FileTree, NodeId, NodeKind, TreeError, TreeNode};

const NODE_COLUMNS: &str = "id, parent_id, name, kind, content_type";

/// SQLite-backed file tree.
pub struct SqliteTree {
    conn: Mutex<Connection>,
}

impl SqliteTree {
    /// Open (or create) a tree database at the given path.
    pub fn new(path: &Path) -> Result<Self, TreeError> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0))
            .map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory tree (useful for testing).
    pub fn in_memory() -> Result<Self, TreeError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TreeError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER REFERENCES nodes(id),
                name TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('directory', 'file')),
                content_type TEXT,
                created_at TEXT NOT NULL,
                UNIQUE(parent_id, name)
            );

            CREATE INDEX IF NOT EXISTS idx_nodes_parent ON nodes(parent_id);
            "#,
        )
        .map_err(db_err)?;

        let root: Option<NodeId> = conn
            .query_row("SELECT id FROM nodes WHERE parent_id IS NULL", [], |row| {
                row.get(0)
            })
            .optional()
            .map_err(db_err)?;

        if root.is_none() {
            conn.execute(
                "INSERT INTO nodes (parent_id, name, kind, content_type, created_at)
                 VALUES (NULL, '', 'directory', NULL, ?)",
                params![Utc::now().to_rfc3339()],
            )
            .map_err(db_err)?;
        }

        Ok(())
    }

    fn row_to_node(row: &rusqlite::Row) -> rusqlite::Result<TreeNode> {
        let kind: String = row.get(3)?;
        let kind = NodeKind::parse(&kind).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("unknown node kind: {}", kind).into(),
            )
        })?;

        Ok(TreeNode {
            id: row.get(0)?,
            parent_id: row.get(1)?,
            name: row.get(2)?,
            kind,
            content_type: row.get(4)?,
        })
    }

    fn get_node(conn: &Connection, id: NodeId) -> Result<Option<TreeNode>, TreeError> {
        conn.query_row(
            &format!("SELECT {} FROM nodes WHERE id = ?", NODE_COLUMNS),
            params![id],
            Self::row_to_node,
        )
        .optional()
        .map_err(db_err)
    }

    fn find_child(
        conn: &Connection,
        parent: NodeId,
        name: &str,
    ) -> Result<Option<TreeNode>, TreeError> {
        conn.query_row(
            &format!(
                "SELECT {} FROM nodes WHERE parent_id = ? AND name = ?",
                NODE_COLUMNS
            ),
            params![parent, name],
            Self::row_to_node,
        )
        .optional()
        .map_err(db_err)
    }

    fn require_directory(conn: &Connection, id: NodeId) -> Result<TreeNode, TreeError> {
        match Self::get_node(conn, id)? {
            Some(node) if node.is_directory() => Ok(node),
            Some(_) => Err(TreeError::NotADirectory(id)),
            None => Err(TreeError::NotFound(id)),
        }
    }

    fn child_count(conn: &Connection, id: NodeId) -> Result<u64, TreeError> {
        conn.query_row(
            "SELECT COUNT(*) FROM nodes WHERE parent_id = ?",
            params![id],
            |row| row.get(0),
        )
        .map_err(db_err)
    }

    fn find_or_create(
        &self,
        name: &str,
        parent: NodeId,
        kind: NodeKind,
        content_type: Option<&str>,
    ) -> Result<TreeNode, TreeError> {
        if name.is_empty() {
            return Err(TreeError::Conflict("node name cannot be empty".to_string()));
        }

        let conn = self.conn.lock().unwrap();
        Self::require_directory(&conn, parent)?;

        if let Some(existing) = Self::find_child(&conn, parent, name)? {
            if existing.kind != kind {
                return Err(TreeError::Conflict(format!(
                    "'{}' already exists as a {}",
                    name,
                    existing.kind.as_str()
                )));
            }
            return Ok(existing);
        }

        conn.execute(
            "INSERT INTO nodes (parent_id, name, kind, content_type, created_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                parent,
                name,
                kind.as_str(),
                content_type,
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(db_err)?;

        Ok(TreeNode {
            id: conn.last_insert_rowid(),
            parent_id: Some(parent),
            name: name.to_string(),
            kind,
            content_type: content_type.map(str::to_string),
        })
    }
}

fn db_err(e: rusqlite::Error) -> TreeError {
    TreeError::Database(e.to_string())
}

impl FileTree for SqliteTree {
    fn root(&self) -> Result<TreeNode, TreeError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM nodes WHERE parent_id IS NULL", NODE_COLUMNS),
            [],
            Self::row_to_node,
        )
        .map_err(db_err)
    }

    fn find_or_create_directory(
        &self,
        name: &str,
        parent: NodeId,
    ) -> Result<TreeNode, TreeError> {
        self.find_or_create(name, parent, NodeKind::Directory, None)
    }

    fn find_or_create_file(
        &self,
        name: &str,
        parent: NodeId,
        content_type: &str,
    ) -> Result<TreeNode, TreeError> {
        self.find_or_create(name, parent, NodeKind::File, Some(content_type))
    }

    fn open(&self, id: NodeId) -> Result<Option<TreeNode>, TreeError> {
        let conn = self.conn.lock().unwrap();
        Self::get_node(&conn, id)
    }

    fn delete_file(&self, id: NodeId) -> Result<(), TreeError> {
        let conn = self.conn.lock().unwrap();
        match Self::get_node(&conn, id)? {
            Some(node) if node.is_file() => {
                conn.execute("DELETE FROM nodes WHERE id = ?", params![id])
                    .map_err(db_err)?;
                Ok(())
            }
            Some(_) => Err(TreeError::NotAFile(id)),
            None => Err(TreeError::NotFound(id)),
        }
    }

    fn delete_directory(&self, id: NodeId) -> Result<(), TreeError> {
        let conn = self.conn.lock().unwrap();
        let node = Self::require_directory(&conn, id)?;

        if node.parent_id.is_none() {
            return Err(TreeError::Conflict(
                "the root directory cannot be deleted".to_string(),
            ));
        }

        if Self::child_count(&conn, id)? > 0 {
            return Err(TreeError::NotEmpty(id));
        }

        conn.execute("DELETE FROM nodes WHERE id = ?", params![id])
            .map_err(db_err)?;
        Ok(())
    }

    fn list_children(&self, dir: NodeId) -> Result<Vec<TreeNode>, TreeError> {
        let conn = self.conn.lock().unwrap();
        Self::require_directory(&conn, dir)?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM nodes WHERE parent_id = ? ORDER BY name",
                NODE_COLUMNS
            ))
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![dir], Self::row_to_node)
            .map_err(db_err)?;

        let mut children = Vec::new();
        for row in rows {
            children.push(row.map_err(db_err)?);
        }
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CONTENT_TYPE: &str = "application/x-debrid-stream";

    fn create_test_tree() -> SqliteTree {
        SqliteTree::in_memory().unwrap()
    }

    #[test]
    fn test_root_is_stable_directory() {
        let tree = create_test_tree();
        let root = tree.root().unwrap();
        assert!(root.is_directory());
        assert!(root.parent_id.is_none());
        assert_eq!(tree.root().unwrap().id, root.id);
    }

    #[test]
    fn test_find_or_create_directory_is_idempotent() {
        let tree = create_test_tree();
        let root = tree.root().unwrap();

        let first = tree.find_or_create_directory("debrid", root.id).unwrap();
        let second = tree.find_or_create_directory("debrid", root.id).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(tree.list_children(root.id).unwrap().len(), 1);
    }

    #[test]
    fn test_find_or_create_file_sets_content_type() {
        let tree = create_test_tree();
        let root = tree.root().unwrap();
        let dir = tree.find_or_create_directory("abc123", root.id).unwrap();

        let file = tree
            .find_or_create_file("Movie.mkv", dir.id, CONTENT_TYPE)
            .unwrap();

        assert!(file.is_file());
        assert_eq!(file.parent_id, Some(dir.id));
        assert_eq!(file.content_type.as_deref(), Some(CONTENT_TYPE));

        let again = tree
            .find_or_create_file("Movie.mkv", dir.id, CONTENT_TYPE)
            .unwrap();
        assert_eq!(file.id, again.id);
    }

    #[test]
    fn test_kind_conflict() {
        let tree = create_test_tree();
        let root = tree.root().unwrap();
        tree.find_or_create_directory("name", root.id).unwrap();

        let result = tree.find_or_create_file("name", root.id, CONTENT_TYPE);
        assert!(matches!(result, Err(TreeError::Conflict(_))));
    }

    #[test]
    fn test_create_under_file_fails() {
        let tree = create_test_tree();
        let root = tree.root().unwrap();
        let file = tree
            .find_or_create_file("a.mkv", root.id, CONTENT_TYPE)
            .unwrap();

        let result = tree.find_or_create_directory("child", file.id);
        assert!(matches!(result, Err(TreeError::NotADirectory(_))));
    }

    #[test]
    fn test_open_missing_returns_none() {
        let tree = create_test_tree();
        assert!(tree.open(9999).unwrap().is_none());
    }

    #[test]
    fn test_delete_file() {
        let tree = create_test_tree();
        let root = tree.root().unwrap();
        let file = tree
            .find_or_create_file("a.mkv", root.id, CONTENT_TYPE)
            .unwrap();

        tree.delete_file(file.id).unwrap();
        assert!(tree.open(file.id).unwrap().is_none());
        assert!(matches!(
            tree.delete_file(file.id),
            Err(TreeError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_non_empty_directory_fails() {
        let tree = create_test_tree();
        let root = tree.root().unwrap();
        let dir = tree.find_or_create_directory("dir", root.id).unwrap();
        tree.find_or_create_file("a.mkv", dir.id, CONTENT_TYPE)
            .unwrap();

        assert!(matches!(
            tree.delete_directory(dir.id),
            Err(TreeError::NotEmpty(_))
        ));
    }

    #[test]
    fn test_delete_empty_directory() {
        let tree = create_test_tree();
        let root = tree.root().unwrap();
        let dir = tree.find_or_create_directory("dir", root.id).unwrap();

        tree.delete_directory(dir.id).unwrap();
        assert!(tree.open(dir.id).unwrap().is_none());
    }

    #[test]
    fn test_root_cannot_be_deleted() {
        let tree = create_test_tree();
        let root = tree.root().unwrap();
        assert!(matches!(
            tree.delete_directory(root.id),
            Err(TreeError::Conflict(_))
        ));
    }

    #[test]
    fn test_list_children_sorted() {
        let tree = create_test_tree();
        let root = tree.root().unwrap();
        tree.find_or_create_directory("b", root.id).unwrap();
        tree.find_or_create_file("a", root.id, CONTENT_TYPE).unwrap();

        let names: Vec<String> = tree
            .list_children(root.id)
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fs.db");

        let dir_id = {
            let tree = SqliteTree::new(&path).unwrap();
            let root = tree.root().unwrap();
            tree.find_or_create_directory("keep", root.id).unwrap().id
        };

        let tree = SqliteTree::new(&path).unwrap();
        let node = tree.open(dir_id).unwrap().unwrap();
        assert_eq!(node.name, "keep");
    }
}
