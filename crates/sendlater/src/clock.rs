//! Wall-clock abstraction.
//!
//! Due-ness of a commitment is decided against a [`Clock`] rather than
//! `OffsetDateTime::now_utc()` directly, so tests and simulations can drive
//! time explicitly.

use std::sync::{Arc, Mutex};

use time::OffsetDateTime;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync + 'static {
    /// The current time (UTC).
    fn now(&self) -> OffsetDateTime;
}

/// System wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Manually advanced clock for tests and simulations.
///
/// Clones share the same underlying instant.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use sendlater::{Clock, ManualClock};
/// use time::OffsetDateTime;
///
/// let clock = ManualClock::at(OffsetDateTime::UNIX_EPOCH);
/// clock.advance(Duration::from_secs(5));
/// assert_eq!(clock.now(), OffsetDateTime::UNIX_EPOCH + time::Duration::seconds(5));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<OffsetDateTime>>,
}

impl ManualClock {
    /// Create a clock pinned at the given instant.
    pub fn at(now: OffsetDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, delta: std::time::Duration) {
        let delta = time::Duration::new(delta.as_secs() as i64, delta.subsec_nanos() as i32);
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += delta;
    }

    /// Pin the clock to a specific instant.
    pub fn set(&self, instant: OffsetDateTime) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
