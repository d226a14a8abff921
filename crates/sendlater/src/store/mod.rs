//! Durable storage for wake commitments.
//!
//! This module provides the [`AlarmStore`] trait that abstracts over
//! commitment storage backends. Two implementations are provided:
//!
//! - [`MemoryStore`] — in-process storage for tests and ephemeral embedding
//! - [`PgStore`] — PostgreSQL storage for production (requires the
//!   `postgres` feature)
//!
//! # Claim protocol
//!
//! Due commitments are claimed one at a time with a lease:
//!
//! 1. [`AlarmStore::claim_due`] atomically selects a due pending commitment
//!    and leases it for `lock_duration`
//! 2. The dispatcher executes the send
//! 3. [`AlarmStore::mark_fired`] or [`AlarmStore::mark_failed`] records the
//!    outcome before the lease expires
//! 4. If the process dies mid-dispatch, the lease expires and the
//!    commitment becomes claimable again
//!
//! Step 4 means delivery is at-least-once: a crash between send and outcome
//! recording produces a duplicate dispatch. Nothing deduplicates, in the
//! store or anywhere above it.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use time::OffsetDateTime;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

use crate::action::{ActionId, ActionState};
use crate::error::Result;

/// A stored wake commitment.
#[derive(Debug, Clone, PartialEq)]
pub struct Commitment {
    /// Derived action identifier; the storage key.
    pub id: ActionId,
    /// When the commitment becomes due.
    pub fire_at: OffsetDateTime,
    /// Serialized [`DispatchSignal`](crate::signal::DispatchSignal).
    pub signal: Value,
    /// Lifecycle state.
    pub state: ActionState,
    /// Last dispatch error, set when `state` is `Failed`.
    pub last_error: Option<String>,
    /// When the commitment was registered (or last replaced).
    pub created_at: OffsetDateTime,
}

/// A claimed commitment, leased to one worker for dispatch.
#[derive(Debug, Clone)]
pub struct ClaimedCommitment {
    /// Derived action identifier.
    pub id: ActionId,
    /// The fire time the commitment was registered for.
    pub fire_at: OffsetDateTime,
    /// Serialized [`DispatchSignal`](crate::signal::DispatchSignal).
    pub signal: Value,
    /// When the commitment was registered.
    pub created_at: OffsetDateTime,
}

/// Storage backend for wake commitments.
///
/// Implementations must make [`put`](Self::put) replace any existing
/// commitment with the same id ("update current" semantics) and must make
/// [`claim_due`](Self::claim_due) atomic so two workers cannot claim the
/// same commitment inside one lease window.
///
/// Fired and failed rows are never deleted by the store; they remain until
/// an id collision overwrites them.
pub trait AlarmStore: Send + Sync + Clone + 'static {
    /// Insert a commitment, replacing any existing commitment with the same
    /// id, including one that already fired or failed.
    fn put(&self, commitment: Commitment) -> impl Future<Output = Result<()>> + Send;

    /// Claim the next due pending commitment, if any.
    ///
    /// A commitment is due when `fire_at <= now` and it is not currently
    /// leased. The returned commitment is leased to `worker_id` until
    /// `now + lock_duration`.
    fn claim_due(
        &self,
        worker_id: &str,
        now: OffsetDateTime,
        lock_duration: Duration,
    ) -> impl Future<Output = Result<Option<ClaimedCommitment>>> + Send;

    /// Record a successful dispatch. Clears the lease.
    fn mark_fired(
        &self,
        id: ActionId,
        at: OffsetDateTime,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Record a failed dispatch with its error. Clears the lease.
    fn mark_failed(
        &self,
        id: ActionId,
        error: &str,
        at: OffsetDateTime,
    ) -> impl Future<Output = Result<()>> + Send;

    /// All pending commitments, ordered by fire time.
    ///
    /// Used for the boot-time rehydration scan and for inspection.
    fn scan_pending(&self) -> impl Future<Output = Result<Vec<Commitment>>> + Send;

    /// Fetch one commitment by id.
    fn get(&self, id: ActionId) -> impl Future<Output = Result<Option<Commitment>>> + Send;
}
