//! Waitlist store (C4): per-event FIFO queue with opt-out.
//!
//! Position allocation is max+1 over the active subset, serialized per
//! event with a transaction-scoped advisory lock so two concurrent
//! joiners cannot draw the same position. Positions are never
//! recompacted; opt-outs leave holes that readers skip.

use crate::providers::WaitlistStore;
use chrono::{DateTime, Utc};
use fairgate_core::{CoreError, EventId, Result, UserId, WaitlistEntry, WaitlistEntryId};
use sqlx::PgPool;

#[derive(sqlx::FromRow)]
struct WaitlistRow {
    id: uuid::Uuid,
    event_id: uuid::Uuid,
    user_id: uuid::Uuid,
    position: i32,
    opted_out: bool,
    notified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl WaitlistRow {
    fn into_entry(self) -> WaitlistEntry {
        WaitlistEntry {
            id: WaitlistEntryId(self.id),
            event_id: EventId(self.event_id),
            user_id: UserId(self.user_id),
            position: self.position,
            opted_out: self.opted_out,
            notified_at: self.notified_at,
            created_at: self.created_at,
        }
    }
}

const WAITLIST_COLUMNS: &str =
    "id, event_id, user_id, position, opted_out, notified_at, created_at";

/// Postgres waitlist store.
#[derive(Clone)]
pub struct PgWaitlistStore {
    pool: PgPool,
}

impl PgWaitlistStore {
    /// Create a store over the shared pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl WaitlistStore for PgWaitlistStore {
    async fn add(&self, event: EventId, user: UserId) -> Result<i32> {
        let mut tx = self.pool.begin().await.map_err(CoreError::database)?;

        // Event-scoped serialization: held until commit, so the read
        // of max(position) and the insert are one critical section.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(event.to_string())
            .execute(&mut *tx)
            .await
            .map_err(CoreError::database)?;

        let (position,): (i32,) = sqlx::query_as(
            r"
            SELECT COALESCE(MAX(position), 0) + 1
            FROM waitlist
            WHERE event_id = $1 AND opted_out = false
            ",
        )
        .bind(event.0)
        .fetch_one(&mut *tx)
        .await
        .map_err(CoreError::database)?;

        sqlx::query(
            r"
            INSERT INTO waitlist (id, event_id, user_id, position, opted_out)
            VALUES ($1, $2, $3, $4, false)
            ",
        )
        .bind(WaitlistEntryId::new().0)
        .bind(event.0)
        .bind(user.0)
        .bind(position)
        .execute(&mut *tx)
        .await
        .map_err(CoreError::database)?;

        tx.commit().await.map_err(CoreError::database)?;

        tracing::info!(event_id = %event, user_id = %user, position, "user waitlisted");
        Ok(position)
    }

    async fn next_active(&self, event: EventId) -> Result<Option<WaitlistEntry>> {
        let row: Option<WaitlistRow> = sqlx::query_as(&format!(
            r"
            SELECT {WAITLIST_COLUMNS} FROM waitlist
            WHERE event_id = $1 AND opted_out = false
            ORDER BY position ASC
            LIMIT 1
            "
        ))
        .bind(event.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::database)?;
        Ok(row.map(WaitlistRow::into_entry))
    }

    async fn remove(&self, id: WaitlistEntryId) -> Result<()> {
        let result = sqlx::query("DELETE FROM waitlist WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(CoreError::database)?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound("waitlist entry"));
        }
        Ok(())
    }

    async fn opt_out(&self, event: EventId, user: UserId) -> Result<()> {
        let result = sqlx::query(
            "UPDATE waitlist SET opted_out = true WHERE event_id = $1 AND user_id = $2",
        )
        .bind(event.0)
        .bind(user.0)
        .execute(&self.pool)
        .await
        .map_err(CoreError::database)?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound("waitlist entry"));
        }
        Ok(())
    }

    async fn mark_notified(&self, id: WaitlistEntryId) -> Result<()> {
        let result = sqlx::query("UPDATE waitlist SET notified_at = now() WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(CoreError::database)?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound("waitlist entry"));
        }
        Ok(())
    }

    async fn count(&self, event: EventId) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM waitlist WHERE event_id = $1 AND opted_out = false",
        )
        .bind(event.0)
        .fetch_one(&self.pool)
        .await
        .map_err(CoreError::database)?;
        Ok(count)
    }

    async fn list_by_event(
        &self,
        event: EventId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WaitlistEntry>> {
        let rows: Vec<WaitlistRow> = sqlx::query_as(&format!(
            r"
            SELECT {WAITLIST_COLUMNS} FROM waitlist
            WHERE event_id = $1
            ORDER BY position ASC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(event.0)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::database)?;
        Ok(rows.into_iter().map(WaitlistRow::into_entry).collect())
    }
}
