//! Runtime that fires due wake commitments.
//!
//! This module owns the timer side of the system:
//!
//! - [`AlarmRuntime`] — coordinator that rehydrates pending commitments at
//!   boot and runs the polling worker
//! - [`RuntimeConfig`] — poll cadence, lease duration, shutdown behavior
//!
//! # Example
//!
//! ```ignore
//! use tokio::signal;
//!
//! let scheduler = SmsScheduler::builder(store, sender).build();
//! let runtime = scheduler.runtime();
//!
//! // Run until Ctrl+C
//! runtime.run(async { signal::ctrl_c().await.ok(); }).await?;
//! ```

mod alarm_worker;
mod config;

pub use config::RuntimeConfig;

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::authz::{Authorization, Capability};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::store::AlarmStore;
use alarm_worker::AlarmWorker;

/// The owned timer service: durable commitments plus a polling worker.
///
/// Pending commitments are rows in the [`AlarmStore`](crate::AlarmStore);
/// nothing else holds the schedule. A process restart therefore loses no
/// commitments: the boot-time scan plus the poll loop pick up whatever is
/// in the store, including commitments that came due while no process was
/// running (those fire near-immediately).
pub struct AlarmRuntime<S: AlarmStore> {
    store: S,
    dispatcher: Arc<Dispatcher<S>>,
    authz: Arc<dyn Authorization>,
    config: RuntimeConfig,
    worker_id: String,
}

impl<S: AlarmStore> AlarmRuntime<S> {
    pub(crate) fn new(
        store: S,
        dispatcher: Arc<Dispatcher<S>>,
        authz: Arc<dyn Authorization>,
        config: RuntimeConfig,
    ) -> Self {
        let worker_id = config
            .worker_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        Self {
            store,
            dispatcher,
            authz,
            config,
            worker_id,
        }
    }

    /// Returns the runtime configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Returns the worker identifier.
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Claim and dispatch one due commitment, if any.
    ///
    /// This is the single step the poll loop repeats. It is public so
    /// embedders (and tests) can drive firing explicitly instead of running
    /// the worker, e.g. against a [`ManualClock`](crate::ManualClock).
    pub async fn pump(&self) -> crate::Result<Option<DispatchOutcome>> {
        self.dispatcher
            .poll_once(&self.worker_id, self.config.lock_duration)
            .await
    }

    /// Run the alarm worker until the shutdown future completes.
    ///
    /// Performs the boot-time rehydration scan, then polls. The poll
    /// cadence is `poll_interval`, or `inexact_poll_interval` when exact
    /// wake scheduling is unauthorized (degraded mode).
    ///
    /// # Shutdown Behavior
    ///
    /// When the shutdown future completes the worker stops claiming new
    /// work, finishes the in-flight dispatch, and exits; after
    /// `shutdown_timeout` the runtime stops waiting.
    pub async fn run<F>(self, shutdown: F) -> crate::Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        // Boot-time rehydration: the schedule is whatever the store holds.
        let pending = self.store.scan_pending().await?;

        let exact = self.authz.check(Capability::ExactAlarm);
        let poll_interval = if exact {
            self.config.poll_interval
        } else {
            warn!("Exact wake scheduling unauthorized, polling at inexact cadence");
            self.config.inexact_poll_interval
        };

        info!(
            worker_id = %self.worker_id,
            pending = pending.len(),
            exact,
            "Alarm runtime starting"
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let worker = AlarmWorker::new(
            Arc::clone(&self.dispatcher),
            poll_interval,
            self.config.lock_duration,
            self.worker_id.clone(),
        );
        let handle = tokio::spawn(worker.run(shutdown_rx));

        shutdown.await;
        let _ = shutdown_tx.send(true);

        match tokio::time::timeout(self.config.shutdown_timeout, handle).await {
            Ok(_) => {
                info!(worker_id = %self.worker_id, "Alarm runtime stopped gracefully");
            }
            Err(_) => {
                warn!(
                    worker_id = %self.worker_id,
                    timeout_secs = self.config.shutdown_timeout.as_secs(),
                    "Shutdown timeout exceeded, forcing stop"
                );
            }
        }

        Ok(())
    }
}
