//! In-process commitment store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use time::OffsetDateTime;

use super::{AlarmStore, ClaimedCommitment, Commitment};
use crate::action::{ActionId, ActionState};
use crate::error::Result;

/// In-memory store for tests and ephemeral embedding.
///
/// Clones share the same underlying map. Commitments do not survive the
/// process, so this store only gives at-or-after delivery within one
/// process lifetime; use [`PgStore`](crate::PgStore) when commitments must
/// outlive a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<HashMap<i64, Row>>>,
}

#[derive(Debug, Clone)]
struct Row {
    commitment: Commitment,
    locked_until: Option<OffsetDateTime>,
    locked_by: Option<String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<i64, Row>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AlarmStore for MemoryStore {
    async fn put(&self, commitment: Commitment) -> Result<()> {
        let mut rows = self.lock();
        // Replaces whatever held this id before, fired or not.
        rows.insert(
            commitment.id.as_i64(),
            Row {
                commitment,
                locked_until: None,
                locked_by: None,
            },
        );
        Ok(())
    }

    async fn claim_due(
        &self,
        worker_id: &str,
        now: OffsetDateTime,
        lock_duration: Duration,
    ) -> Result<Option<ClaimedCommitment>> {
        let mut rows = self.lock();

        let due = rows
            .values_mut()
            .filter(|row| {
                row.commitment.state == ActionState::Pending
                    && row.commitment.fire_at <= now
                    && row.locked_until.is_none_or(|until| until <= now)
            })
            .min_by_key(|row| row.commitment.fire_at);

        let Some(row) = due else {
            return Ok(None);
        };

        let lease = time::Duration::new(
            lock_duration.as_secs() as i64,
            lock_duration.subsec_nanos() as i32,
        );
        row.locked_until = Some(now + lease);
        row.locked_by = Some(worker_id.to_owned());

        Ok(Some(ClaimedCommitment {
            id: row.commitment.id,
            fire_at: row.commitment.fire_at,
            signal: row.commitment.signal.clone(),
            created_at: row.commitment.created_at,
        }))
    }

    async fn mark_fired(&self, id: ActionId, _at: OffsetDateTime) -> Result<()> {
        let mut rows = self.lock();
        if let Some(row) = rows.get_mut(&id.as_i64()) {
            row.commitment.state = ActionState::Fired;
            row.commitment.last_error = None;
            row.locked_until = None;
            row.locked_by = None;
        }
        Ok(())
    }

    async fn mark_failed(&self, id: ActionId, error: &str, _at: OffsetDateTime) -> Result<()> {
        let mut rows = self.lock();
        if let Some(row) = rows.get_mut(&id.as_i64()) {
            row.commitment.state = ActionState::Failed;
            row.commitment.last_error = Some(error.to_owned());
            row.locked_until = None;
            row.locked_by = None;
        }
        Ok(())
    }

    async fn scan_pending(&self) -> Result<Vec<Commitment>> {
        let rows = self.lock();
        let mut pending: Vec<Commitment> = rows
            .values()
            .filter(|row| row.commitment.state == ActionState::Pending)
            .map(|row| row.commitment.clone())
            .collect();
        pending.sort_by_key(|c| c.fire_at);
        Ok(pending)
    }

    async fn get(&self, id: ActionId) -> Result<Option<Commitment>> {
        let rows = self.lock();
        Ok(rows.get(&id.as_i64()).map(|row| row.commitment.clone()))
    }
}
