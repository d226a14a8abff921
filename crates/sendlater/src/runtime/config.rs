//! Runtime configuration.

use std::time::Duration;

/// Configuration for the alarm runtime.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use sendlater::RuntimeConfig;
///
/// let config = RuntimeConfig {
///     poll_interval: Duration::from_millis(100),
///     allow_inexact: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// How often to poll for due commitments when exact wake scheduling is
    /// authorized.
    ///
    /// Firing precision is bounded by this interval. Default: 250ms.
    pub poll_interval: Duration,

    /// Poll cadence in the degraded mode, when exact wake scheduling is
    /// unauthorized but `allow_inexact` is set.
    ///
    /// Default: 30 seconds.
    pub inexact_poll_interval: Duration,

    /// Accept scheduling without exact-alarm authorization, degrading firing
    /// precision to `inexact_poll_interval`.
    ///
    /// When `false` (the default), scheduling without the authorization is
    /// refused with a permission error.
    pub allow_inexact: bool,

    /// How long a claimed commitment stays leased to a worker.
    ///
    /// Should exceed the longest expected send. A process that dies while
    /// holding a lease lets it expire, after which the commitment is
    /// dispatched again. Default: 60 seconds.
    pub lock_duration: Duration,

    /// Maximum time to wait for the in-flight dispatch during shutdown.
    ///
    /// Default: 30 seconds.
    pub shutdown_timeout: Duration,

    /// Worker identifier recorded on claim leases.
    ///
    /// If `None`, a UUID is generated at runtime startup.
    pub worker_id: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            inexact_poll_interval: Duration::from_secs(30),
            allow_inexact: false,
            lock_duration: Duration::from_secs(60),
            shutdown_timeout: Duration::from_secs(30),
            worker_id: None,
        }
    }
}
