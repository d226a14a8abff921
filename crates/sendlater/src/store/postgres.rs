//! PostgreSQL commitment store.

use std::time::Duration;

use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;

use super::{AlarmStore, ClaimedCommitment, Commitment};
use crate::action::{ActionId, ActionState};
use crate::error::{Error, Result};

/// PostgreSQL-backed store for commitments that must survive process death.
///
/// # Database Schema
///
/// Requires one table in the `sendlater` schema, created by
/// [`PgStore::migrate`]:
///
/// | Column         | Purpose                                        |
/// |----------------|------------------------------------------------|
/// | `id`           | Derived action id (primary key)                |
/// | `fire_at`      | When the commitment becomes due                |
/// | `signal`       | Dispatch signal payload (JSONB)                |
/// | `state`        | `pending` / `fired` / `failed`                 |
/// | `last_error`   | Last dispatch error, for failed rows           |
/// | `locked_until` | Claim lease expiry                             |
/// | `locked_by`    | Worker holding the lease (debugging)           |
///
/// # Concurrency
///
/// Claims use `FOR UPDATE SKIP LOCKED` so concurrent processes never lease
/// the same commitment inside one lease window. A process that dies while
/// holding a lease simply lets it expire; the commitment is then claimed
/// again, which is where the at-least-once duplicate window comes from.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store from a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `sendlater` schema and commitments table if absent.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query("CREATE SCHEMA IF NOT EXISTS sendlater")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sendlater.commitments (
                id           BIGINT PRIMARY KEY,
                fire_at      TIMESTAMPTZ NOT NULL,
                signal       JSONB NOT NULL,
                state        TEXT NOT NULL DEFAULT 'pending',
                last_error   TEXT,
                created_at   TIMESTAMPTZ NOT NULL,
                locked_until TIMESTAMPTZ,
                locked_by    TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS commitments_due_idx
            ON sendlater.commitments (fire_at)
            WHERE state = 'pending'
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn commitment_from_row(row: &PgRow) -> Result<Commitment> {
        let state: String = row.try_get("state")?;
        let state = ActionState::parse(&state).ok_or_else(|| {
            Error::InvalidArguments(format!("unknown commitment state in store: {state}"))
        })?;
        Ok(Commitment {
            id: ActionId::from_raw(row.try_get("id")?),
            fire_at: row.try_get("fire_at")?,
            signal: row.try_get::<Value, _>("signal")?,
            state,
            last_error: row.try_get("last_error")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl AlarmStore for PgStore {
    async fn put(&self, commitment: Commitment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sendlater.commitments
                (id, fire_at, signal, state, last_error, created_at, locked_until, locked_by)
            VALUES ($1, $2, $3, $4, $5, $6, NULL, NULL)
            ON CONFLICT (id) DO UPDATE SET
                fire_at = EXCLUDED.fire_at,
                signal = EXCLUDED.signal,
                state = EXCLUDED.state,
                last_error = EXCLUDED.last_error,
                created_at = EXCLUDED.created_at,
                locked_until = NULL,
                locked_by = NULL
            "#,
        )
        .bind(commitment.id.as_i64())
        .bind(commitment.fire_at)
        .bind(&commitment.signal)
        .bind(commitment.state.as_str())
        .bind(&commitment.last_error)
        .bind(commitment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn claim_due(
        &self,
        worker_id: &str,
        now: OffsetDateTime,
        lock_duration: Duration,
    ) -> Result<Option<ClaimedCommitment>> {
        let lease = time::Duration::new(
            lock_duration.as_secs() as i64,
            lock_duration.subsec_nanos() as i32,
        );
        let row = sqlx::query(
            r#"
            UPDATE sendlater.commitments
            SET locked_until = $3, locked_by = $2
            WHERE id = (
                SELECT id FROM sendlater.commitments
                WHERE state = 'pending'
                  AND fire_at <= $1
                  AND (locked_until IS NULL OR locked_until <= $1)
                ORDER BY fire_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, fire_at, signal, created_at
            "#,
        )
        .bind(now)
        .bind(worker_id)
        .bind(now + lease)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(ClaimedCommitment {
            id: ActionId::from_raw(row.try_get("id")?),
            fire_at: row.try_get("fire_at")?,
            signal: row.try_get::<Value, _>("signal")?,
            created_at: row.try_get("created_at")?,
        }))
    }

    async fn mark_fired(&self, id: ActionId, _at: OffsetDateTime) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sendlater.commitments
            SET state = 'fired', last_error = NULL, locked_until = NULL, locked_by = NULL
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_failed(&self, id: ActionId, error: &str, _at: OffsetDateTime) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sendlater.commitments
            SET state = 'failed', last_error = $2, locked_until = NULL, locked_by = NULL
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn scan_pending(&self) -> Result<Vec<Commitment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, fire_at, signal, state, last_error, created_at
            FROM sendlater.commitments
            WHERE state = 'pending'
            ORDER BY fire_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::commitment_from_row).collect()
    }

    async fn get(&self, id: ActionId) -> Result<Option<Commitment>> {
        let row = sqlx::query(
            r#"
            SELECT id, fire_at, signal, state, last_error, created_at
            FROM sendlater.commitments
            WHERE id = $1
            "#,
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::commitment_from_row).transpose()
    }
}
