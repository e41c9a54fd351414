//! Ingestion: mapping one catalog entry into tree nodes and index records.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use tracing::{debug, warn};

use crate::config::{DirectoryNaming, LibraryConfig};
use crate::index::{IndexTx, NewTorrentFile};
use crate::origin::{CatalogEntry, EntryDetail, RemoteOrigin};
use crate::tree::{self, FileTree};

use super::{IngestOutcome, SyncError};

/// Characters that cannot appear in a directory name.
static UNSAFE_NAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[/\\\x00-\x1f\x7f]").unwrap());

/// Maps catalog entries into the tree and the index.
pub struct Ingestor {
    tree: Arc<dyn FileTree>,
    origin: Arc<dyn RemoteOrigin>,
    library: LibraryConfig,
}

impl Ingestor {
    pub fn new(
        tree: Arc<dyn FileTree>,
        origin: Arc<dyn RemoteOrigin>,
        library: LibraryConfig,
    ) -> Self {
        Self {
            tree,
            origin,
            library,
        }
    }

    /// Ingest one entry inside the caller's transaction.
    ///
    /// The caller owns the savepoint: on `Failed` it must roll back, on
    /// `Rejected` it records the rejection.
    pub async fn ingest(&self, tx: &mut IndexTx, entry: &CatalogEntry) -> IngestOutcome {
        let detail = match self.origin.entry_detail(&entry.id).await {
            Ok(detail) => detail,
            Err(e) => return IngestOutcome::Failed(e.into()),
        };

        if let Some(reason) = rejection_reason(&detail) {
            return IngestOutcome::Rejected { reason };
        }

        match self.bind(tx, entry, &detail) {
            Ok(outcome) => outcome,
            Err(e) => IngestOutcome::Failed(e),
        }
    }

    fn bind(
        &self,
        tx: &IndexTx,
        entry: &CatalogEntry,
        detail: &EntryDetail,
    ) -> Result<IngestOutcome, SyncError> {
        let library = tree::library_root(self.tree.as_ref(), &self.library.root_dir)?;
        let container_name = container_name(entry, self.library.naming);
        let container = self
            .tree
            .find_or_create_directory(&container_name, library.id)?;

        let torrent = tx.insert_torrent(&entry.id, &entry.filename)?;

        let mut files = 0;
        let mut skipped = 0;

        for ((file_index, file), link) in detail.selected_files().into_iter().zip(&detail.links) {
            let name = file.path.strip_prefix('/').unwrap_or(&file.path);
            let node = self
                .tree
                .find_or_create_file(name, container.id, &self.library.content_type)?;

            if let Some(existing) = tx.file_by_node(node.id)? {
                if existing.torrent_id != torrent.id {
                    warn!(
                        remote_id = %entry.id,
                        node_id = node.id,
                        "File node already bound to another entry, skipping"
                    );
                }
                skipped += 1;
                continue;
            }

            tx.insert_file(&NewTorrentFile {
                torrent_id: torrent.id,
                path: &file.path,
                size_bytes: file.bytes,
                link,
                file_index: file_index as u32,
                node_id: node.id,
            })?;
            files += 1;
        }

        // Never leave a torrent without files
        if files == 0 {
            return Err(SyncError::NameCollision {
                remote_id: entry.id.clone(),
                container: container_name,
                files: skipped,
            });
        }

        debug!(
            remote_id = %entry.id,
            container = %container_name,
            files,
            skipped,
            "Bound entry to tree"
        );

        Ok(IngestOutcome::Ingested {
            torrent_id: torrent.id,
            files,
            skipped,
        })
    }
}

/// Why an entry can never be mirrored, if it can't.
pub fn rejection_reason(detail: &EntryDetail) -> Option<String> {
    let selected = detail.files.iter().filter(|f| f.selected).count();

    if selected == 0 {
        return Some("no selected files".to_string());
    }

    if selected > detail.links.len() {
        return Some(format!(
            "{} selected files but only {} links",
            selected,
            detail.links.len()
        ));
    }

    None
}

/// Name of the directory holding an entry's files.
pub fn container_name(entry: &CatalogEntry, naming: DirectoryNaming) -> String {
    let display = sanitize_name(&entry.filename);

    match naming {
        DirectoryNaming::Id => entry.id.clone(),
        DirectoryNaming::Name if is_usable(&display) => display,
        DirectoryNaming::NameWithId if is_usable(&display) => {
            format!("{} [{}]", display, entry.id)
        }
        // Nothing usable left of the display name
        DirectoryNaming::Name | DirectoryNaming::NameWithId => entry.id.clone(),
    }
}

fn sanitize_name(name: &str) -> String {
    UNSAFE_NAME_CHARS.replace_all(name, "_").trim().to_string()
}

fn is_usable(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".."
}
