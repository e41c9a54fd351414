//! Single-flight reconciliation of the remote catalog against local state.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::{LibraryConfig, SyncConfig};
use crate::index::{IndexTx, SqliteIndex, TorrentRecord};
use crate::metrics;
use crate::origin::{CatalogEntry, OriginError, RemoteOrigin};
use crate::poller::{PollEvent, PollHandler};
use crate::tree::FileTree;

use super::{
    IngestOutcome, Ingestor, ReconcilerStatus, SyncError, SyncReport, Teardown, TeardownMode,
    TriggerSource,
};

const ADD_SAVEPOINT: &str = "add_entry";
const REMOVE_SAVEPOINT: &str = "remove_entry";
const SWEEP_SAVEPOINT: &str = "sweep_entry";

/// Holds the single-flight flag for the duration of a pass.
///
/// Releases the flag on drop, including on panic.
struct RunGuard {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    fn acquire(running: &Arc<AtomicBool>) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                running: Arc::clone(running),
            })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Drives the catalog, the index and the tree toward agreement.
///
/// A pass has three phases, each in its own index transaction:
/// 1. ingest ready entries that are neither indexed nor rejected
/// 2. tear down indexed entries that left the catalog
/// 3. sweep file records whose node is gone, then tear down (and delete
///    remotely) torrents left without files
///
/// Only one pass runs at a time. Triggers arriving during a pass are dropped.
pub struct Reconciler {
    index: Arc<SqliteIndex>,
    tree: Arc<dyn FileTree>,
    origin: Arc<dyn RemoteOrigin>,
    ingestor: Ingestor,
    teardown: Teardown,
    page_size: u32,

    running: Arc<AtomicBool>,
    passes: AtomicU64,
    dropped_triggers: AtomicU64,
    last_report: RwLock<Option<SyncReport>>,
}

impl Reconciler {
    pub fn new(
        index: Arc<SqliteIndex>,
        tree: Arc<dyn FileTree>,
        origin: Arc<dyn RemoteOrigin>,
        library: LibraryConfig,
        sync: &SyncConfig,
    ) -> Self {
        let teardown = Teardown::new(
            Arc::clone(&tree),
            Arc::clone(&origin),
            library.root_dir.clone(),
        );
        let ingestor = Ingestor::new(Arc::clone(&tree), Arc::clone(&origin), library);

        Self {
            index,
            tree,
            origin,
            ingestor,
            teardown,
            page_size: sync.page_size,
            running: Arc::new(AtomicBool::new(false)),
            passes: AtomicU64::new(0),
            dropped_triggers: AtomicU64::new(0),
            last_report: RwLock::new(None),
        }
    }

    /// Whether a pass is in progress.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run a pass now. Returns `None` if another pass is already running.
    pub async fn trigger(&self, source: TriggerSource) -> Option<SyncReport> {
        let _guard = self.try_start(source)?;
        Some(self.execute(source).await)
    }

    /// Start a pass in the background. Returns `false` if another pass is
    /// already running.
    pub fn spawn_trigger(self: &Arc<Self>, source: TriggerSource) -> bool {
        let guard = match self.try_start(source) {
            Some(guard) => guard,
            None => return false,
        };

        let reconciler = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = guard;
            reconciler.execute(source).await;
        });
        true
    }

    /// Current state and the report of the last finished pass.
    pub async fn status(&self) -> ReconcilerStatus {
        ReconcilerStatus {
            running: self.is_running(),
            passes: self.passes.load(Ordering::Relaxed),
            dropped_triggers: self.dropped_triggers.load(Ordering::Relaxed),
            last_report: self.last_report.read().await.clone(),
        }
    }

    /// Report of the last finished pass.
    pub async fn last_report(&self) -> Option<SyncReport> {
        self.last_report.read().await.clone()
    }

    fn try_start(&self, source: TriggerSource) -> Option<RunGuard> {
        match RunGuard::acquire(&self.running) {
            Some(guard) => {
                metrics::SYNC_TRIGGERS
                    .with_label_values(&[source.as_str(), "started"])
                    .inc();
                Some(guard)
            }
            None => {
                info!(trigger = %source, "Reconciliation already running, dropping trigger");
                self.dropped_triggers.fetch_add(1, Ordering::Relaxed);
                metrics::SYNC_TRIGGERS
                    .with_label_values(&[source.as_str(), "dropped"])
                    .inc();
                None
            }
        }
    }

    /// Run one pass. The caller holds the run guard.
    async fn execute(&self, source: TriggerSource) -> SyncReport {
        let started = Instant::now();
        let mut report = SyncReport::new(source);
        info!(trigger = %source, origin = self.origin.name(), "Reconciliation started");

        match self.fetch_catalog().await {
            Ok(entries) => {
                report.catalog_size = entries.len();

                if let Err(e) = self.ingest_new(&entries, &mut report).await {
                    self.phase_failed("ingest", e, &mut report);
                }
                if let Err(e) = self.remove_stale(&entries, &mut report).await {
                    self.phase_failed("remove", e, &mut report);
                }
                if let Err(e) = self.sweep_orphans(&mut report).await {
                    self.phase_failed("sweep", e, &mut report);
                }
            }
            Err(e) => {
                error!(trigger = %source, error = %e, "Failed to fetch catalog, aborting pass");
                report.aborted = Some(e.to_string());
            }
        }

        let elapsed = started.elapsed();
        report.duration_ms = elapsed.as_millis() as u64;
        report.finished_at = Some(Utc::now());

        let result = if report.aborted.is_some() {
            "aborted"
        } else if report.phase_errors.is_empty() {
            "complete"
        } else {
            "partial"
        };
        metrics::SYNC_PASSES.with_label_values(&[result]).inc();
        metrics::SYNC_DURATION
            .with_label_values(&[source.as_str()])
            .observe(elapsed.as_secs_f64());

        info!(
            trigger = %source,
            result,
            catalog = report.catalog_size,
            ingested = report.ingested,
            rejected = report.rejected,
            failed = report.failed,
            removed = report.removed,
            orphan_records = report.orphan_records,
            orphan_torrents = report.orphan_torrents,
            duration_ms = report.duration_ms,
            "Reconciliation finished"
        );

        self.passes.fetch_add(1, Ordering::Relaxed);
        *self.last_report.write().await = Some(report.clone());
        report
    }

    fn phase_failed(&self, phase: &str, e: SyncError, report: &mut SyncReport) {
        error!(phase, error = %e, "Reconciliation phase aborted");
        report.phase_errors.push(format!("{}: {}", phase, e));
    }

    /// Collect the whole catalog, page by page.
    async fn fetch_catalog(&self) -> Result<Vec<CatalogEntry>, OriginError> {
        let mut entries = Vec::new();
        let mut page = 1;

        loop {
            let batch = self.origin.list_entries(page, self.page_size).await?;
            if batch.entries.is_empty() {
                break;
            }

            let page_len = batch.entries.len();
            entries.extend(batch.entries);

            // Without a total, only a short page marks the end
            let last_page = match batch.total {
                Some(total) => entries.len() as u64 >= total,
                None => page_len < self.page_size as usize,
            };
            if last_page {
                break;
            }
            page += 1;
        }

        debug!(entries = entries.len(), pages = page, "Fetched catalog");
        Ok(entries)
    }

    async fn ingest_new(
        &self,
        entries: &[CatalogEntry],
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let ready: Vec<&CatalogEntry> = entries.iter().filter(|e| e.is_ready()).collect();
        report.ready_entries = ready.len();

        let mut tx = self.index.begin()?;
        let indexed = tx.torrent_remote_ids()?;
        let rejected = tx.rejected_remote_ids()?;

        for entry in ready {
            if indexed.contains(&entry.id) || rejected.contains(&entry.id) {
                continue;
            }

            if let Err(e) = tx.savepoint(ADD_SAVEPOINT) {
                warn!(remote_id = %entry.id, error = %e, "Failed to open savepoint, skipping entry");
                report.failed += 1;
                continue;
            }

            match self.ingestor.ingest(&mut tx, entry).await {
                IngestOutcome::Ingested { files, skipped, .. } => {
                    if close_savepoint(&mut tx, ADD_SAVEPOINT) {
                        info!(remote_id = %entry.id, name = %entry.filename, files, skipped, "Ingested entry");
                        report.ingested += 1;
                        metrics::ENTRIES_PROCESSED
                            .with_label_values(&["ingested"])
                            .inc();
                    } else {
                        report.failed += 1;
                    }
                }
                IngestOutcome::Rejected { reason } => {
                    let recorded = match tx.insert_rejected(&entry.id, &entry.filename, &reason) {
                        Ok(_) => close_savepoint(&mut tx, ADD_SAVEPOINT),
                        Err(e) => {
                            warn!(remote_id = %entry.id, error = %e, "Failed to record rejection");
                            discard_savepoint(&mut tx, ADD_SAVEPOINT);
                            false
                        }
                    };

                    if recorded {
                        warn!(remote_id = %entry.id, name = %entry.filename, reason = %reason, "Rejected entry");
                        report.rejected += 1;
                        metrics::ENTRIES_PROCESSED
                            .with_label_values(&["rejected"])
                            .inc();
                    } else {
                        report.failed += 1;
                    }
                }
                IngestOutcome::Failed(e) => {
                    warn!(remote_id = %entry.id, error = %e, "Failed to ingest entry, will retry");
                    discard_savepoint(&mut tx, ADD_SAVEPOINT);
                    report.failed += 1;
                    metrics::ENTRIES_PROCESSED
                        .with_label_values(&["failed"])
                        .inc();
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    async fn remove_stale(
        &self,
        entries: &[CatalogEntry],
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let present: HashSet<&str> = entries.iter().map(|e| e.id.as_str()).collect();

        let mut tx = self.index.begin()?;
        let stale: Vec<_> = tx
            .torrents()?
            .into_iter()
            .filter(|t| !present.contains(t.remote_id.as_str()))
            .collect();

        for torrent in &stale {
            if self
                .teardown_in_savepoint(&mut tx, torrent, TeardownMode::LocalOnly, REMOVE_SAVEPOINT)
                .await
            {
                report.removed += 1;
                metrics::ENTRIES_PROCESSED
                    .with_label_values(&["removed"])
                    .inc();
            } else {
                report.failed += 1;
            }
        }

        tx.commit()?;
        Ok(())
    }

    async fn sweep_orphans(&self, report: &mut SyncReport) -> Result<(), SyncError> {
        let mut tx = self.index.begin()?;
        let torrents = tx.torrents()?;

        // Drop records whose node disappeared from the tree
        for torrent in &torrents {
            let files = match tx.files_for_torrent(torrent.id) {
                Ok(files) => files,
                Err(e) => {
                    warn!(remote_id = %torrent.remote_id, error = %e, "Failed to load file records");
                    continue;
                }
            };

            for record in files {
                match self.tree.open(record.node_id) {
                    Ok(Some(_)) => {}
                    Ok(None) => match tx.delete_file(record.id) {
                        Ok(()) => {
                            info!(
                                remote_id = %torrent.remote_id,
                                node_id = record.node_id,
                                path = %record.path,
                                "Removed file record for missing node"
                            );
                            report.orphan_records += 1;
                        }
                        Err(e) => {
                            warn!(record_id = record.id, error = %e, "Failed to remove orphan file record");
                        }
                    },
                    Err(e) => {
                        warn!(node_id = record.node_id, error = %e, "Failed to open node, keeping record");
                    }
                }
            }
        }

        // Torrents left without files are gone for good
        for torrent in &torrents {
            match tx.count_files(torrent.id) {
                Ok(0) => {}
                Ok(_) => continue,
                Err(e) => {
                    warn!(remote_id = %torrent.remote_id, error = %e, "Failed to count file records");
                    continue;
                }
            }

            if self
                .teardown_in_savepoint(
                    &mut tx,
                    torrent,
                    TeardownMode::RemoteEffecting,
                    SWEEP_SAVEPOINT,
                )
                .await
            {
                report.orphan_torrents += 1;
                metrics::ENTRIES_PROCESSED
                    .with_label_values(&["orphaned"])
                    .inc();
            } else {
                report.failed += 1;
            }
        }

        tx.commit()?;
        Ok(())
    }

    async fn teardown_in_savepoint(
        &self,
        tx: &mut IndexTx,
        torrent: &TorrentRecord,
        mode: TeardownMode,
        savepoint: &str,
    ) -> bool {
        if let Err(e) = tx.savepoint(savepoint) {
            warn!(remote_id = %torrent.remote_id, error = %e, "Failed to open savepoint, skipping teardown");
            return false;
        }

        match self.teardown.teardown(tx, torrent, mode).await {
            Ok(_) => close_savepoint(tx, savepoint),
            Err(e) => {
                warn!(remote_id = %torrent.remote_id, error = %e, "Teardown failed, will retry");
                discard_savepoint(tx, savepoint);
                false
            }
        }
    }
}

/// Release a savepoint, discarding its changes if the release fails.
fn close_savepoint(tx: &mut IndexTx, name: &str) -> bool {
    match tx.release(name) {
        Ok(()) => true,
        Err(e) => {
            warn!(savepoint = name, error = %e, "Failed to release savepoint");
            discard_savepoint(tx, name);
            false
        }
    }
}

fn discard_savepoint(tx: &mut IndexTx, name: &str) {
    if let Err(e) = tx.rollback_to(name) {
        warn!(savepoint = name, error = %e, "Failed to roll back savepoint");
    }
}

#[async_trait]
impl PollHandler for Reconciler {
    async fn handle(&self, event: PollEvent) {
        let source = match event {
            PollEvent::ContentChanged { .. } => TriggerSource::ContentChange,
            PollEvent::Interval => TriggerSource::Interval,
        };
        self.trigger(source).await;
    }
}
