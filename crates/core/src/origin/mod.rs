//! Remote origin abstraction.
//!
//! The origin hosts the catalog being mirrored. This module provides the
//! `RemoteOrigin` trait and a Real-Debrid implementation.

mod real_debrid;
mod types;

pub use real_debrid::RealDebridClient;
pub use types::*;

use async_trait::async_trait;

/// Trait for debrid origins.
#[async_trait]
pub trait RemoteOrigin: Send + Sync {
    /// Name of the backend (e.g., "real-debrid").
    fn name(&self) -> &str;

    /// List one page of the catalog. Pages start at 1.
    async fn list_entries(&self, page: u32, limit: u32) -> Result<CatalogPage, OriginError>;

    /// Get files and direct links for one entry.
    async fn entry_detail(&self, id: &str) -> Result<EntryDetail, OriginError>;

    /// Exchange a stored direct link for a short-lived download URL.
    async fn unrestrict_link(&self, link: &str) -> Result<UnrestrictedLink, OriginError>;

    /// Delete an entry from the origin.
    async fn delete_entry(&self, id: &str) -> Result<(), OriginError>;
}
