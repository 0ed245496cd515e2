//! Seat registry (C3): per-event seat state machine.
//!
//! Every transition is guarded by the current status in SQL, so only
//! the legal edges (`available→held→booked`, `held→available`,
//! `booked→available`) can fire; a stale update simply matches zero
//! rows. The in-transaction helpers are shared with the booking
//! ledger, whose create/finalize/cancel transactions flip seats and
//! booking rows atomically.

use chrono::{DateTime, Utc};
use fairgate_core::{BookingId, CoreError, EventId, Result, Seat, SeatStatus};
use sqlx::postgres::PgConnection;
use sqlx::PgPool;

#[derive(sqlx::FromRow)]
struct SeatRow {
    id: uuid::Uuid,
    event_id: uuid::Uuid,
    seat_label: String,
    status: String,
    held_by_booking: Option<uuid::Uuid>,
    held_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SeatRow {
    fn into_seat(self) -> Result<Seat> {
        Ok(Seat {
            id: self.id,
            event_id: EventId(self.event_id),
            label: self.seat_label,
            status: SeatStatus::parse(&self.status)?,
            held_by: self.held_by_booking.map(BookingId),
            held_until: self.held_until,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Move `available` seats to `held` for a booking. Returns the number
/// of rows transitioned; callers inside a transaction roll back when
/// the count is short of the batch.
pub(crate) async fn hold_in_tx(
    conn: &mut PgConnection,
    event: EventId,
    labels: &[String],
    booking: BookingId,
    until: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query(
        r"
        UPDATE seats
        SET status = 'held', held_by_booking = $1, held_until = $2, updated_at = now()
        WHERE event_id = $3 AND seat_label = ANY($4) AND status = 'available'
        ",
    )
    .bind(booking.0)
    .bind(until)
    .bind(event.0)
    .bind(labels)
    .execute(conn)
    .await
    .map_err(CoreError::database)?;
    Ok(result.rows_affected())
}

/// Move seats `held` by this booking to `booked`.
pub(crate) async fn book_in_tx(
    conn: &mut PgConnection,
    event: EventId,
    labels: &[String],
    booking: BookingId,
) -> Result<u64> {
    let result = sqlx::query(
        r"
        UPDATE seats
        SET status = 'booked', held_until = NULL, updated_at = now()
        WHERE event_id = $1 AND seat_label = ANY($2)
          AND status = 'held' AND held_by_booking = $3
        ",
    )
    .bind(event.0)
    .bind(labels)
    .bind(booking.0)
    .execute(conn)
    .await
    .map_err(CoreError::database)?;
    Ok(result.rows_affected())
}

/// Return a booking's seats to `available`, clearing back-references.
pub(crate) async fn release_in_tx(
    conn: &mut PgConnection,
    event: EventId,
    labels: &[String],
    booking: BookingId,
) -> Result<u64> {
    let result = sqlx::query(
        r"
        UPDATE seats
        SET status = 'available', held_by_booking = NULL, held_until = NULL, updated_at = now()
        WHERE event_id = $1 AND seat_label = ANY($2) AND held_by_booking = $3
        ",
    )
    .bind(event.0)
    .bind(labels)
    .bind(booking.0)
    .execute(conn)
    .await
    .map_err(CoreError::database)?;
    Ok(result.rows_affected())
}

/// Postgres seat registry.
#[derive(Clone)]
pub struct PgSeatRegistry {
    pool: PgPool,
}

impl PgSeatRegistry {
    /// Create a registry over the shared pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the seat set for a new event, all `available`.
    ///
    /// # Errors
    ///
    /// Returns a conflict when a label already exists for the event.
    pub async fn create_seats(&self, event: EventId, labels: &[String]) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO seats (event_id, seat_label, status)
            SELECT $1, label, 'available' FROM UNNEST($2::text[]) AS label
            ",
        )
        .bind(event.0)
        .bind(labels)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                CoreError::Conflict("seat label already exists for event".to_string())
            }
            _ => CoreError::database(e),
        })?;
        Ok(())
    }

    /// Hold a batch of available seats for a booking. The whole batch
    /// must transition or the call fails with a conflict.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Conflict`] when any label is not available.
    pub async fn hold_seats(
        &self,
        event: EventId,
        labels: &[String],
        booking: BookingId,
        until: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(CoreError::database)?;
        let held = hold_in_tx(&mut *tx, event, labels, booking, until).await?;
        if held != labels.len() as u64 {
            // Roll back the partial batch; no orphaned holds.
            return Err(CoreError::Conflict(
                "one or more requested seats are not available".to_string(),
            ));
        }
        tx.commit().await.map_err(CoreError::database)?;
        Ok(())
    }

    /// Book a batch of seats currently held by this booking.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Conflict`] when any seat is not held by the
    /// booking.
    pub async fn book_seats(
        &self,
        event: EventId,
        labels: &[String],
        booking: BookingId,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(CoreError::database)?;
        let booked = book_in_tx(&mut *tx, event, labels, booking).await?;
        if booked != labels.len() as u64 {
            return Err(CoreError::Conflict(
                "one or more seats are not held by this booking".to_string(),
            ));
        }
        tx.commit().await.map_err(CoreError::database)?;
        Ok(())
    }

    /// Release a booking's seats back to `available`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Transient`] on database failure.
    pub async fn release_seats(
        &self,
        event: EventId,
        labels: &[String],
        booking: BookingId,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(CoreError::database)?;
        release_in_tx(&mut *tx, event, labels, booking).await?;
        tx.commit().await.map_err(CoreError::database)?;
        Ok(())
    }

    /// Labels of currently available seats, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Transient`] on database failure.
    pub async fn available_seats(&self, event: EventId) -> Result<Vec<String>> {
        let labels: Vec<(String,)> = sqlx::query_as(
            r"
            SELECT seat_label FROM seats
            WHERE event_id = $1 AND status = 'available'
            ORDER BY seat_label
            ",
        )
        .bind(event.0)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::database)?;
        Ok(labels.into_iter().map(|(label,)| label).collect())
    }

    /// All seats of an event in label order.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Transient`] on database failure.
    pub async fn seats_for_event(&self, event: EventId) -> Result<Vec<Seat>> {
        let rows: Vec<SeatRow> = sqlx::query_as(
            r"
            SELECT id, event_id, seat_label, status, held_by_booking, held_until,
                   created_at, updated_at
            FROM seats
            WHERE event_id = $1
            ORDER BY seat_label
            ",
        )
        .bind(event.0)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::database)?;
        rows.into_iter().map(SeatRow::into_seat).collect()
    }
}
