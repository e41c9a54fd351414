//! Fixed-interval fallback poller.

use std::sync::Arc;
use std::time::Duration;

use super::{spawn_ticker, PollEvent, PollHandler, PollerHandle};
use crate::metrics;

/// Invokes the handler on every tick, whether or not anything changed.
///
/// Catches catalog changes the content poller misses.
pub struct IntervalPoller {
    handler: Arc<dyn PollHandler>,
}

impl IntervalPoller {
    pub fn new(handler: Arc<dyn PollHandler>) -> Self {
        Self { handler }
    }

    pub fn spawn(self, period: Duration) -> PollerHandle {
        let handler = self.handler;
        spawn_ticker("interval", period, move || {
            let handler = Arc::clone(&handler);
            async move {
                metrics::POLLER_TICKS
                    .with_label_values(&["interval", "fired"])
                    .inc();
                handler.handle(PollEvent::Interval).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct RecordingHandler {
        events: RwLock<Vec<PollEvent>>,
    }

    #[async_trait]
    impl PollHandler for RecordingHandler {
        async fn handle(&self, event: PollEvent) {
            self.events.write().await.push(event);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_every_period() {
        let handler = Arc::new(RecordingHandler::default());
        let handle = IntervalPoller::new(handler.clone()).spawn(Duration::from_secs(600));

        tokio::time::sleep(Duration::from_secs(1801)).await;
        handle.shutdown().await;

        let events = handler.events.read().await;
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| *e == PollEvent::Interval));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_events_after_stop() {
        let handler = Arc::new(RecordingHandler::default());
        let handle = IntervalPoller::new(handler.clone()).spawn(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(15)).await;
        handle.shutdown().await;
        tokio::time::sleep(Duration::from_secs(100)).await;

        assert_eq!(handler.events.read().await.len(), 1);
    }
}
