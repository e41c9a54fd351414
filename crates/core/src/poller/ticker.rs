//! Cancellable periodic task.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Handle to a running poller loop.
///
/// Dropping the handle also stops the loop.
pub struct PollerHandle {
    name: &'static str,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Ask the loop to exit. A tick in progress runs to completion first.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to exit.
    pub async fn join(self) {
        let PollerHandle { name, stop_tx, task } = self;
        if let Err(e) = task.await {
            warn!(poller = name, error = %e, "Poller task ended abnormally");
        }
        drop(stop_tx);
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(self) {
        self.stop();
        self.join().await;
    }
}

/// Run `tick` every `period` until stopped.
///
/// The first tick fires one full period after spawning. Ticks never overlap;
/// a slow tick delays the next one.
pub fn spawn_ticker<F, Fut>(name: &'static str, period: Duration, mut tick: F) -> PollerHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(poller = name, period_secs = period.as_secs(), "Poller started");
        loop {
            tokio::select! {
                biased;
                changed = stop_rx.changed() => {
                    if changed.is_err() || *stop_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => tick().await,
            }
        }
        info!(poller = name, "Poller stopped");
    });

    PollerHandle {
        name,
        stop_tx,
        task,
    }
}
