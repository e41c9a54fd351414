//! Content-hash poller.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::header::CACHE_CONTROL;
use reqwest::StatusCode;
use scraper::{Html, Selector};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::{spawn_ticker, PollError, PollEvent, PollHandler, PollerHandle};
use crate::metrics;

/// Watches one element of a web page and reports when its content changes.
pub struct ChangePoller {
    client: reqwest::Client,
    url: String,
    element: String,
    handler: Arc<dyn PollHandler>,
    last_hash: Mutex<Option<String>>,
}

impl ChangePoller {
    /// Create a poller for `element` (a CSS selector) on the page at `url`.
    ///
    /// Each fetch gives up after `timeout`.
    pub fn new(
        url: impl Into<String>,
        element: impl Into<String>,
        timeout: Duration,
        handler: Arc<dyn PollHandler>,
    ) -> Result<Self, PollError> {
        let element = element.into();
        Selector::parse(&element).map_err(|e| PollError::Selector(e.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PollError::Fetch(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            element,
            handler,
            last_hash: Mutex::new(None),
        })
    }

    /// Hash of the last observed fragment.
    pub fn last_hash(&self) -> Option<String> {
        self.last_hash.lock().unwrap().clone()
    }

    /// Run one tick. Returns the new hash when a change was reported.
    pub async fn poll_once(&self) -> Result<Option<String>, PollError> {
        let response = self
            .client
            .get(&self.url)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| PollError::Fetch(e.to_string()))?;

        if response.status() != StatusCode::OK {
            return Err(PollError::Status(response.status().as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PollError::Fetch(e.to_string()))?;
        let hash = fingerprint_fragment(&body, &self.element)?;

        {
            let mut last = self.last_hash.lock().unwrap();
            if last.as_deref() == Some(hash.as_str()) {
                debug!(url = %self.url, "Watched content unchanged");
                return Ok(None);
            }
            *last = Some(hash.clone());
        }

        info!(url = %self.url, hash = %hash, "Watched content changed");
        self.handler
            .handle(PollEvent::ContentChanged { hash: hash.clone() })
            .await;

        Ok(Some(hash))
    }

    /// Run the poller every `period` until the handle is stopped.
    pub fn spawn(self: Arc<Self>, period: Duration) -> PollerHandle {
        spawn_ticker("change", period, move || {
            let poller = Arc::clone(&self);
            async move {
                match poller.poll_once().await {
                    Ok(Some(_)) => {
                        metrics::POLLER_TICKS
                            .with_label_values(&["change", "changed"])
                            .inc();
                    }
                    Ok(None) => {
                        metrics::POLLER_TICKS
                            .with_label_values(&["change", "unchanged"])
                            .inc();
                    }
                    Err(e) => {
                        warn!(url = %poller.url, error = %e, "Change poll failed, skipping tick");
                        metrics::POLLER_TICKS
                            .with_label_values(&["change", "error"])
                            .inc();
                    }
                }
            }
        })
    }
}

/// SHA-256 hex digest of the inner HTML of the first element matching
/// `element`.
pub fn fingerprint_fragment(html: &str, element: &str) -> Result<String, PollError> {
    let selector = Selector::parse(element).map_err(|e| PollError::Selector(e.to_string()))?;
    let document = Html::parse_document(html);

    let fragment = document
        .select(&selector)
        .next()
        .ok_or_else(|| PollError::ElementNotFound(element.to_string()))?
        .inner_html();

    if fragment.trim().is_empty() {
        return Err(PollError::EmptyFragment);
    }

    Ok(format!("{:x}", Sha256::digest(fragment.as_bytes())))
}
