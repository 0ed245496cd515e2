//! Booking ledger (C2): durable, transactional booking records.
//!
//! The `bookings` table is hash-partitioned by event id, so all writes
//! for one booking land in one partition and a hot event does not
//! contend with the rest. Single-booking writes serialize on a row
//! lock taken inside each operation's transaction.

use crate::providers::BookingLedger;
use crate::stores::postgres::seats;
use chrono::{DateTime, Utc};
use fairgate_core::{
    Booking, BookingId, BookingStatus, CoreError, EventId, PaymentStatus, Result, UserId,
};
use sqlx::postgres::PgConnection;
use sqlx::{PgPool, Row};

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: uuid::Uuid,
    user_id: uuid::Uuid,
    event_id: uuid::Uuid,
    status: String,
    seats: Vec<String>,
    idempotency_key: Option<String>,
    payment_status: String,
    amount_paid: f64,
    version: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking> {
        Ok(Booking {
            id: BookingId(self.id),
            user_id: UserId(self.user_id),
            event_id: EventId(self.event_id),
            status: BookingStatus::parse(&self.status)?,
            seats: self.seats,
            idempotency_key: self.idempotency_key,
            payment_status: PaymentStatus::parse(&self.payment_status)?,
            amount_paid: self.amount_paid,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const BOOKING_COLUMNS: &str = "id, user_id, event_id, status, seats, idempotency_key, \
                               payment_status, amount_paid, version, created_at, updated_at";

/// Postgres booking ledger.
#[derive(Clone)]
pub struct PgBookingLedger {
    pool: PgPool,
}

impl PgBookingLedger {
    /// Create a ledger over the shared pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_by_idempotency(
        conn: &mut PgConnection,
        event: EventId,
        key: &str,
    ) -> Result<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE event_id = $1 AND idempotency_key = $2"
        ))
        .bind(event.0)
        .bind(key)
        .fetch_optional(conn)
        .await
        .map_err(CoreError::database)?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn bump_held_count(
        conn: &mut PgConnection,
        event: EventId,
        delta: i32,
    ) -> Result<()> {
        sqlx::query(
            r"
            UPDATE event_capacity
            SET held_count = GREATEST(held_count + $1, 0)
            WHERE event_id = $2
            ",
        )
        .bind(delta)
        .bind(event.0)
        .execute(conn)
        .await
        .map_err(CoreError::database)?;
        Ok(())
    }
}

impl BookingLedger for PgBookingLedger {
    async fn create_pending(
        &self,
        user: UserId,
        event: EventId,
        idempotency_key: Option<&str>,
        seat_labels: &[String],
        hold_until: DateTime<Utc>,
    ) -> Result<Booking> {
        let mut tx = self.pool.begin().await.map_err(CoreError::database)?;

        // Replay guard: return the prior booking unchanged. The unique
        // constraint on (event_id, idempotency_key) closes the race
        // between this check and the insert below.
        if let Some(key) = idempotency_key {
            if let Some(existing) = Self::fetch_by_idempotency(&mut *tx, event, key).await? {
                return Ok(existing);
            }
        }

        let inserted: std::result::Result<BookingRow, sqlx::Error> = sqlx::query_as(&format!(
            r"
            INSERT INTO bookings (id, user_id, event_id, status, seats, idempotency_key, payment_status)
            VALUES ($1, $2, $3, 'pending', $4, $5, 'pending')
            RETURNING {BOOKING_COLUMNS}
            "
        ))
        .bind(BookingId::new().0)
        .bind(user.0)
        .bind(event.0)
        .bind(seat_labels)
        .bind(idempotency_key)
        .fetch_one(&mut *tx)
        .await;

        let booking = match inserted {
            Ok(row) => row.into_booking()?,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                // A concurrent replay won the insert; return its row.
                drop(tx);
                let key = idempotency_key.ok_or_else(|| {
                    CoreError::Conflict("duplicate booking insert".to_string())
                })?;
                let mut conn = self.pool.acquire().await.map_err(CoreError::database)?;
                return Self::fetch_by_idempotency(&mut *conn, event, key)
                    .await?
                    .ok_or_else(|| CoreError::Conflict("idempotency replay vanished".to_string()));
            }
            Err(e) => return Err(CoreError::database(e)),
        };

        // Hold the requested seats in the same transaction; a partial
        // batch aborts the insert so no orphaned holds survive.
        let held = seats::hold_in_tx(&mut *tx, event, seat_labels, booking.id, hold_until).await?;
        if held != seat_labels.len() as u64 {
            return Err(CoreError::Conflict(
                "one or more requested seats are not available".to_string(),
            ));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        Self::bump_held_count(&mut *tx, event, seat_labels.len() as i32).await?;

        tx.commit().await.map_err(CoreError::database)?;

        tracing::info!(
            booking_id = %booking.id,
            event_id = %event,
            user_id = %user,
            seats = held,
            "pending booking created"
        );
        Ok(booking)
    }

    async fn get(&self, booking: BookingId) -> Result<Option<Booking>> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"
        ))
        .bind(booking.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::database)?;
        row.map(BookingRow::into_booking).transpose()
    }

    async fn get_by_idempotency(&self, event: EventId, key: &str) -> Result<Option<Booking>> {
        let mut conn = self.pool.acquire().await.map_err(CoreError::database)?;
        Self::fetch_by_idempotency(&mut *conn, event, key).await
    }

    async fn finalize(
        &self,
        booking: BookingId,
        seat_labels: &[String],
        amount_paid: f64,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(CoreError::database)?;

        // Row lock serializes against a concurrent cancel or timeout.
        let row = sqlx::query("SELECT event_id, status FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(booking.0)
            .fetch_optional(&mut *tx)
            .await
            .map_err(CoreError::database)?;
        let Some(row) = row else {
            return Err(CoreError::NotFound("booking"));
        };
        let event = EventId(row.get::<uuid::Uuid, _>("event_id"));
        if row.get::<&str, _>("status") != "pending" {
            // Refuse as a no-op: the booking was already finalized,
            // cancelled or timed out.
            return Ok(());
        }

        sqlx::query(
            r"
            UPDATE bookings
            SET status = 'booked', amount_paid = $1, payment_status = 'paid',
                version = version + 1, updated_at = now()
            WHERE id = $2
            ",
        )
        .bind(amount_paid)
        .bind(booking.0)
        .execute(&mut *tx)
        .await
        .map_err(CoreError::database)?;

        let booked = seats::book_in_tx(&mut *tx, event, seat_labels, booking).await?;
        if booked != seat_labels.len() as u64 {
            return Err(CoreError::Conflict(
                "booking seats are not all held by this booking".to_string(),
            ));
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let n = seat_labels.len() as i32;
        sqlx::query(
            r"
            UPDATE event_capacity
            SET reserved_count = reserved_count + $1,
                held_count = GREATEST(held_count - $1, 0)
            WHERE event_id = $2
            ",
        )
        .bind(n)
        .bind(event.0)
        .execute(&mut *tx)
        .await
        .map_err(CoreError::database)?;

        tx.commit().await.map_err(CoreError::database)?;

        tracing::info!(booking_id = %booking, event_id = %event, amount_paid, "booking finalized");
        Ok(())
    }

    async fn cancel(&self, booking: BookingId) -> Result<(Booking, bool)> {
        let mut tx = self.pool.begin().await.map_err(CoreError::database)?;

        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE"
        ))
        .bind(booking.0)
        .fetch_optional(&mut *tx)
        .await
        .map_err(CoreError::database)?;
        let mut record = row
            .ok_or(CoreError::NotFound("booking"))?
            .into_booking()?;

        match record.status {
            BookingStatus::Pending | BookingStatus::Booked => {}
            // A second cancel is a no-op so the user path and the
            // timeout path can race safely.
            BookingStatus::Cancelled => return Ok((record, false)),
            BookingStatus::Waitlisted | BookingStatus::Expired => {
                return Err(CoreError::Conflict(format!(
                    "booking in state {} cannot be cancelled",
                    record.status.as_str()
                )));
            }
        }

        let was_booked = record.status == BookingStatus::Booked;

        sqlx::query(
            r"
            UPDATE bookings
            SET status = 'cancelled', version = version + 1, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(booking.0)
        .execute(&mut *tx)
        .await
        .map_err(CoreError::database)?;

        // Free the seats either way; only a previously booked booking
        // moves the persisted reserved counter.
        seats::release_in_tx(&mut *tx, record.event_id, &record.seats, booking).await?;

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let n = record.seats.len() as i32;
        if was_booked {
            sqlx::query(
                r"
                UPDATE event_capacity
                SET reserved_count = GREATEST(reserved_count - $1, 0)
                WHERE event_id = $2
                ",
            )
            .bind(n)
            .bind(record.event_id.0)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::database)?;
        } else {
            Self::bump_held_count(&mut *tx, record.event_id, -n).await?;
        }

        tx.commit().await.map_err(CoreError::database)?;

        record.status = BookingStatus::Cancelled;
        tracing::info!(booking_id = %booking, was_booked, "booking cancelled");
        Ok((record, was_booked))
    }

    async fn update_payment_status(
        &self,
        booking: BookingId,
        status: PaymentStatus,
        amount: f64,
    ) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE bookings
            SET payment_status = $1, amount_paid = $2, version = version + 1, updated_at = now()
            WHERE id = $3
            ",
        )
        .bind(status.as_str())
        .bind(amount)
        .bind(booking.0)
        .execute(&self.pool)
        .await
        .map_err(CoreError::database)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound("booking"));
        }
        Ok(())
    }

    async fn status(&self, booking: BookingId) -> Result<Option<BookingStatus>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT status FROM bookings WHERE id = $1")
                .bind(booking.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(CoreError::database)?;
        row.map(|(s,)| BookingStatus::parse(&s)).transpose()
    }

    async fn list_by_user(&self, user: UserId, limit: i64, offset: i64) -> Result<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            r"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(user.0)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::database)?;
        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn list_by_event(
        &self,
        event: EventId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Booking>> {
        let rows: Vec<BookingRow> = sqlx::query_as(&format!(
            r"
            SELECT {BOOKING_COLUMNS} FROM bookings
            WHERE event_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(event.0)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::database)?;
        rows.into_iter().map(BookingRow::into_booking).collect()
    }
}
