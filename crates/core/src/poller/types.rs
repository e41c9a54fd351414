//! Types for change detection.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a change-detection tick.
#[derive(Debug, Clone, Error)]
pub enum PollError {
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Unexpected HTTP status: {0}")]
    Status(u16),

    #[error("Invalid selector: {0}")]
    Selector(String),

    #[error("No element matches selector: {0}")]
    ElementNotFound(String),

    #[error("Matched element is empty")]
    EmptyFragment,
}

/// What a poller observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// The watched fragment changed. Carries the new SHA-256 hex digest.
    ContentChanged { hash: String },
    /// A fallback tick fired.
    Interval,
}

/// Receives poller events.
#[async_trait]
pub trait PollHandler: Send + Sync {
    async fn handle(&self, event: PollEvent);
}
