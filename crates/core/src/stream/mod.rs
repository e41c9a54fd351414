//! Streaming-link resolution for remotely backed files.
//!
//! Size comes from the index without touching the origin. Download URLs are
//! exchanged on every request and never cached, since the origin hands out
//! short-lived links.

mod types;

pub use types::*;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::index::{SqliteIndex, TorrentFileRecord};
use crate::metrics;
use crate::origin::RemoteOrigin;
use crate::tree::{FileTree, NodeId, TreeNode};

/// Resolves tree nodes to file metadata and download URLs.
pub struct StreamResolver {
    index: Arc<SqliteIndex>,
    tree: Arc<dyn FileTree>,
    origin: Arc<dyn RemoteOrigin>,
    content_type: String,
}

impl StreamResolver {
    pub fn new(
        index: Arc<SqliteIndex>,
        tree: Arc<dyn FileTree>,
        origin: Arc<dyn RemoteOrigin>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            index,
            tree,
            origin,
            content_type: content_type.into(),
        }
    }

    /// Metadata for a node. `Ok(None)` when the node is not remotely backed.
    pub fn stat(&self, node_id: NodeId) -> Result<Option<FileStat>, StreamError> {
        Ok(self.lookup(node_id)?.map(|(node, record)| FileStat {
            node_id,
            name: node.name,
            size_bytes: record.size_bytes,
            content_type: self.content_type.clone(),
        }))
    }

    /// Fresh download URL for a node. `Ok(None)` when the node is not
    /// remotely backed.
    pub async fn stream_url(&self, node_id: NodeId) -> Result<Option<StreamUrl>, StreamError> {
        let (node, record) = match self.lookup(node_id) {
            Ok(Some(found)) => found,
            Ok(None) => {
                metrics::STREAM_RESOLUTIONS
                    .with_label_values(&["not_remote"])
                    .inc();
                return Ok(None);
            }
            Err(e) => {
                let result = match e {
                    StreamError::NodeNotFound(_) => "not_found",
                    _ => "error",
                };
                metrics::STREAM_RESOLUTIONS.with_label_values(&[result]).inc();
                return Err(e);
            }
        };

        let link = match self.origin.unrestrict_link(&record.link).await {
            Ok(link) => link,
            Err(e) => {
                warn!(node_id, error = %e, "Failed to unrestrict link");
                metrics::STREAM_RESOLUTIONS
                    .with_label_values(&["error"])
                    .inc();
                return Err(e.into());
            }
        };

        debug!(node_id, name = %node.name, "Resolved stream URL");
        metrics::STREAM_RESOLUTIONS
            .with_label_values(&["resolved"])
            .inc();

        Ok(Some(StreamUrl {
            node_id,
            url: link.download,
            filename: node.name,
            size_bytes: record.size_bytes,
        }))
    }

    fn lookup(
        &self,
        node_id: NodeId,
    ) -> Result<Option<(TreeNode, TorrentFileRecord)>, StreamError> {
        let node = self
            .tree
            .open(node_id)?
            .ok_or(StreamError::NodeNotFound(node_id))?;

        if !node.is_file() || node.content_type.as_deref() != Some(self.content_type.as_str()) {
            return Ok(None);
        }

        Ok(self.index.file_by_node(node_id)?.map(|record| (node, record)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::NewTorrentFile;
    use crate::origin::OriginError;
    use crate::testing::{fixtures, MockOrigin};
    use crate::tree::{self, SqliteTree};
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        tree: Arc<dyn FileTree>,
        origin: Arc<MockOrigin>,
        resolver: StreamResolver,
        file: NodeId,
        container: NodeId,
    }

    fn harness() -> Harness {
        let dir = TempDir::new().unwrap();
        let index = Arc::new(SqliteIndex::new(&dir.path().join("index.db")).unwrap());
        let tree: Arc<dyn FileTree> = Arc::new(SqliteTree::in_memory().unwrap());
        let origin = Arc::new(MockOrigin::new());

        let library = tree::library_root(tree.as_ref(), fixtures::LIBRARY_ROOT).unwrap();
        let container = tree.find_or_create_directory("abc123", library.id).unwrap();
        let file = tree
            .find_or_create_file("Movie.mkv", container.id, fixtures::CONTENT_TYPE)
            .unwrap();

        let tx = index.begin().unwrap();
        let torrent = tx.insert_torrent("abc123", "Movie.mkv").unwrap();
        let link = fixtures::link("abc123", 0);
        tx.insert_file(&NewTorrentFile {
            torrent_id: torrent.id,
            path: "/Movie.mkv",
            size_bytes: 1_500_000_000,
            link: &link,
            file_index: 0,
            node_id: file.id,
        })
        .unwrap();
        tx.commit().unwrap();

        let resolver = StreamResolver::new(
            index,
            Arc::clone(&tree),
            Arc::clone(&origin) as Arc<dyn RemoteOrigin>,
            fixtures::CONTENT_TYPE,
        );

        Harness {
            _dir: dir,
            tree,
            origin,
            resolver,
            file: file.id,
            container: container.id,
        }
    }

    #[test]
    fn test_stat_uses_index_size() {
        let h = harness();

        let stat = h.resolver.stat(h.file).unwrap().unwrap();

        assert_eq!(stat.size_bytes, 1_500_000_000);
        assert_eq!(stat.name, "Movie.mkv");
        assert_eq!(stat.content_type, fixtures::CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_stat_does_not_call_origin() {
        let h = harness();
        h.resolver.stat(h.file).unwrap();
        assert!(h.origin.unrestricted_links().await.is_empty());
    }

    #[test]
    fn test_unknown_node_is_not_found() {
        let h = harness();
        assert!(matches!(
            h.resolver.stat(9999),
            Err(StreamError::NodeNotFound(9999))
        ));
    }

    #[test]
    fn test_directories_and_local_files_are_not_remote() {
        let h = harness();
        let local = h
            .tree
            .find_or_create_file("notes.txt", h.container, "text/plain")
            .unwrap();
        let untracked = h
            .tree
            .find_or_create_file("extra.mkv", h.container, fixtures::CONTENT_TYPE)
            .unwrap();

        assert!(h.resolver.stat(h.container).unwrap().is_none());
        assert!(h.resolver.stat(local.id).unwrap().is_none());
        assert!(h.resolver.stat(untracked.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stream_url_is_never_cached() {
        let h = harness();

        let first = h.resolver.stream_url(h.file).await.unwrap().unwrap();
        let second = h.resolver.stream_url(h.file).await.unwrap().unwrap();

        assert_ne!(first.url, second.url);
        assert_eq!(first.size_bytes, 1_500_000_000);
        assert_eq!(
            h.origin.unrestricted_links().await,
            vec![fixtures::link("abc123", 0), fixtures::link("abc123", 0)]
        );
    }

    #[tokio::test]
    async fn test_stream_url_surfaces_origin_errors() {
        let h = harness();
        h.origin
            .set_next_error(OriginError::Unauthorized("bad token".to_string()))
            .await;

        assert!(matches!(
            h.resolver.stream_url(h.file).await,
            Err(StreamError::Origin(OriginError::Unauthorized(_)))
        ));
        // No retry, no memory of the failure
        assert!(h.resolver.stream_url(h.file).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_stream_url_for_directory_is_none() {
        let h = harness();
        assert!(h.resolver.stream_url(h.container).await.unwrap().is_none());
        assert!(h.origin.unrestricted_links().await.is_empty());
    }
}
