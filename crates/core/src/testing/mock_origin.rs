//! Mock remote origin for testing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::origin::{
    CatalogEntry, CatalogPage, EntryDetail, OriginError, RemoteOrigin, UnrestrictedLink,
};

/// Mock implementation of the RemoteOrigin trait.
///
/// Provides controllable behavior for testing:
/// - Serve a catalog in pages and per-entry details
/// - Record delete and unrestrict calls for assertions
/// - Simulate failures and slow listings
///
/// # Example
///
/// ```rust,ignore
/// let origin = MockOrigin::new();
/// origin.add_entry(fixtures::ready_entry("abc123", "Movie.mkv", 1_500_000_000),
///                  fixtures::single_file_detail("abc123", "/Movie.mkv", 1_500_000_000)).await;
///
/// origin.set_next_error(OriginError::Timeout).await;
/// assert!(origin.list_entries(1, 100).await.is_err());
///
/// let deleted = origin.deleted_entries().await;
/// ```
#[derive(Debug, Default)]
pub struct MockOrigin {
    /// Catalog in listing order.
    entries: Arc<RwLock<Vec<CatalogEntry>>>,
    /// Details by entry id.
    details: Arc<RwLock<HashMap<String, EntryDetail>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<OriginError>>>,
    /// Errors returned by entry_detail for specific ids (persistent).
    detail_errors: Arc<RwLock<HashMap<String, OriginError>>>,
    /// Error returned by every delete_entry call (persistent).
    delete_error: Arc<RwLock<Option<OriginError>>>,
    /// Overrides the reported catalog total.
    reported_total: Arc<RwLock<Option<u64>>>,
    /// Leave the catalog total out of listings.
    omit_total: Arc<RwLock<bool>>,
    /// Delay applied to every list_entries call.
    list_delay: Arc<RwLock<Option<Duration>>>,
    /// Recorded list_entries calls as (page, limit).
    list_calls: Arc<RwLock<Vec<(u32, u32)>>>,
    /// Recorded entry_detail calls.
    detail_calls: Arc<RwLock<Vec<String>>>,
    /// Recorded delete_entry calls.
    deleted: Arc<RwLock<Vec<String>>>,
    /// Recorded unrestrict_link calls.
    unrestricted: Arc<RwLock<Vec<String>>>,
}

impl MockOrigin {
    /// Create an empty mock origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to the catalog with its detail.
    pub async fn add_entry(&self, entry: CatalogEntry, detail: EntryDetail) {
        self.details.write().await.insert(entry.id.clone(), detail);
        self.entries.write().await.push(entry);
    }

    /// Append an entry that has no detail (detail lookups return NotFound).
    pub async fn add_listing(&self, entry: CatalogEntry) {
        self.entries.write().await.push(entry);
    }

    /// Remove an entry from the catalog, as if deleted on the origin.
    pub async fn remove_entry(&self, id: &str) {
        self.entries.write().await.retain(|e| e.id != id);
        self.details.write().await.remove(id);
    }

    /// Replace the detail of an entry.
    pub async fn set_detail(&self, detail: EntryDetail) {
        self.details.write().await.insert(detail.id.clone(), detail);
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: OriginError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every entry_detail call for `id` fail.
    pub async fn fail_detail(&self, id: &str, error: OriginError) {
        self.detail_errors
            .write()
            .await
            .insert(id.to_string(), error);
    }

    /// Stop failing entry_detail calls for `id`.
    pub async fn clear_detail_error(&self, id: &str) {
        self.detail_errors.write().await.remove(id);
    }

    /// Make every delete_entry call fail (None restores normal behavior).
    pub async fn set_delete_error(&self, error: Option<OriginError>) {
        *self.delete_error.write().await = error;
    }

    /// Report a catalog total different from the real entry count.
    pub async fn set_reported_total(&self, total: Option<u64>) {
        *self.reported_total.write().await = total;
    }

    /// List pages without a catalog total, like a response missing its
    /// count header.
    pub async fn set_omit_total(&self, omit: bool) {
        *self.omit_total.write().await = omit;
    }

    /// Slow down every list_entries call.
    pub async fn set_list_delay(&self, delay: Option<Duration>) {
        *self.list_delay.write().await = delay;
    }

    /// Number of entries currently in the catalog.
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Recorded list_entries calls.
    pub async fn list_calls(&self) -> Vec<(u32, u32)> {
        self.list_calls.read().await.clone()
    }

    /// Recorded entry_detail calls.
    pub async fn detail_calls(&self) -> Vec<String> {
        self.detail_calls.read().await.clone()
    }

    /// Ids passed to delete_entry.
    pub async fn deleted_entries(&self) -> Vec<String> {
        self.deleted.read().await.clone()
    }

    /// Links passed to unrestrict_link.
    pub async fn unrestricted_links(&self) -> Vec<String> {
        self.unrestricted.read().await.clone()
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<OriginError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl RemoteOrigin for MockOrigin {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_entries(&self, page: u32, limit: u32) -> Result<CatalogPage, OriginError> {
        self.list_calls.write().await.push((page, limit));

        let delay = *self.list_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let entries = self.entries.read().await;
        let start = (page.saturating_sub(1) as usize).saturating_mul(limit as usize);
        let page_entries: Vec<CatalogEntry> = entries
            .iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect();

        let total = if *self.omit_total.read().await {
            None
        } else {
            Some(
                self.reported_total
                    .read()
                    .await
                    .unwrap_or(entries.len() as u64),
            )
        };

        Ok(CatalogPage {
            entries: page_entries,
            total,
        })
    }

    async fn entry_detail(&self, id: &str) -> Result<EntryDetail, OriginError> {
        self.detail_calls.write().await.push(id.to_string());

        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        if let Some(err) = self.detail_errors.read().await.get(id) {
            return Err(err.clone());
        }

        self.details
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| OriginError::NotFound(id.to_string()))
    }

    async fn unrestrict_link(&self, link: &str) -> Result<UnrestrictedLink, OriginError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        let mut calls = self.unrestricted.write().await;
        calls.push(link.to_string());

        // A fresh URL per call, like the real short-lived links
        Ok(UnrestrictedLink {
            download: format!("https://download.mock/{}/{}", calls.len(), link),
            filename: link.rsplit('/').next().unwrap_or(link).to_string(),
            filesize: 0,
            mime_type: None,
        })
    }

    async fn delete_entry(&self, id: &str) -> Result<(), OriginError> {
        self.deleted.write().await.push(id.to_string());

        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        if let Some(err) = self.delete_error.read().await.clone() {
            return Err(err);
        }

        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| e.id != id);
        let removed = entries.len() != before;
        drop(entries);

        self.details.write().await.remove(id);

        if removed {
            Ok(())
        } else {
            Err(OriginError::NotFound(id.to_string()))
        }
    }
}
