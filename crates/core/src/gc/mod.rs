//! Empty-directory garbage collection under the library root.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::poller::{spawn_ticker, PollerHandle};
use crate::tree::{self, FileTree, NodeId, TreeError};

/// Result of one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GcReport {
    /// Directories deleted.
    pub pruned: usize,
    /// Directories that could not be inspected or deleted.
    pub errors: usize,
}

/// Prunes empty directories left behind by teardown or partial ingestion.
pub struct GarbageCollector {
    tree: Arc<dyn FileTree>,
    root_dir: String,
}

impl GarbageCollector {
    pub fn new(tree: Arc<dyn FileTree>, root_dir: impl Into<String>) -> Self {
        Self {
            tree,
            root_dir: root_dir.into(),
        }
    }

    /// Walk the library depth-first and delete every directory that ends up
    /// empty. The library root itself is kept.
    pub fn collect(&self) -> Result<GcReport, TreeError> {
        let library = tree::library_root(self.tree.as_ref(), &self.root_dir)?;
        let mut report = GcReport::default();

        self.prune_children(library.id, &mut report)?;

        if report.pruned > 0 {
            info!(pruned = report.pruned, errors = report.errors, "Pruned empty directories");
        }
        metrics::GC_DIRECTORIES_PRUNED.inc_by(report.pruned as u64);
        Ok(report)
    }

    /// Run a collection every `period` until the handle is stopped.
    pub fn spawn(self: Arc<Self>, period: Duration) -> PollerHandle {
        spawn_ticker("gc", period, move || {
            let gc = Arc::clone(&self);
            async move {
                match gc.collect() {
                    Ok(_) => metrics::GC_RUNS.with_label_values(&["ok"]).inc(),
                    Err(e) => {
                        warn!(error = %e, "Garbage collection failed");
                        metrics::GC_RUNS.with_label_values(&["error"]).inc();
                    }
                }
            }
        })
    }

    fn prune_children(&self, dir: NodeId, report: &mut GcReport) -> Result<(), TreeError> {
        for child in self.tree.list_children(dir)? {
            if !child.is_directory() {
                continue;
            }

            // Children first, so whole empty chains collapse in one run
            if let Err(e) = self.prune_children(child.id, report) {
                warn!(node_id = child.id, error = %e, "Failed to walk directory");
                report.errors += 1;
                continue;
            }

            match self.tree.list_children(child.id) {
                Ok(rest) if rest.is_empty() => match self.tree.delete_directory(child.id) {
                    Ok(()) => {
                        debug!(node_id = child.id, name = %child.name, "Deleted empty directory");
                        report.pruned += 1;
                    }
                    Err(TreeError::NotFound(_)) => {}
                    Err(e) => {
                        warn!(node_id = child.id, error = %e, "Failed to delete empty directory");
                        report.errors += 1;
                    }
                },
                Ok(_) => {}
                Err(e) => {
                    warn!(node_id = child.id, error = %e, "Failed to list directory");
                    report.errors += 1;
                }
            }
        }

        Ok(())
    }
}
