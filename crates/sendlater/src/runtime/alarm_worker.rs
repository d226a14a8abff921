//! Alarm worker polling the commitment store for due wake-ups.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::interval;
use tracing::{error, info};

use crate::dispatch::Dispatcher;
use crate::store::AlarmStore;

/// Worker that polls for due commitments and routes them to the dispatcher.
///
/// The worker runs in a loop, claiming commitments one at a time and
/// dispatching them sequentially; each dispatch runs to completion before
/// the next claim.
///
/// # Lifecycle
///
/// 1. Tick at the configured poll cadence
/// 2. Claim one due commitment (lease with expiry)
/// 3. Dispatch it; the dispatcher records the outcome
/// 4. Repeat until shutdown signal
pub(crate) struct AlarmWorker<S: AlarmStore> {
    dispatcher: Arc<Dispatcher<S>>,
    poll_interval: Duration,
    lock_duration: Duration,
    worker_id: String,
}

impl<S: AlarmStore> AlarmWorker<S> {
    /// Create a new alarm worker.
    pub fn new(
        dispatcher: Arc<Dispatcher<S>>,
        poll_interval: Duration,
        lock_duration: Duration,
        worker_id: String,
    ) -> Self {
        Self {
            dispatcher,
            poll_interval,
            lock_duration,
            worker_id,
        }
    }

    /// Run the worker until the shutdown signal flips.
    ///
    /// When the shutdown receiver signals, the worker finishes the current
    /// dispatch (if any) and exits.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut poll = interval(self.poll_interval);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(worker_id = %self.worker_id, "Alarm worker started");

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    if let Err(e) = self
                        .dispatcher
                        .poll_once(&self.worker_id, self.lock_duration)
                        .await
                    {
                        error!(error = %e, "Error claiming due commitment");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(worker_id = %self.worker_id, "Alarm worker shutting down");
                        break;
                    }
                }
            }
        }
    }
}
