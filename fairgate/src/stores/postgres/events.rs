//! Event catalog: read-mostly event access plus the persisted
//! capacity pairs the reconciler treats as authoritative.

use crate::providers::EventCatalog;
use chrono::{DateTime, Utc};
use fairgate_core::{CapacityRecord, CoreError, Event, EventId, EventStatus, Result};
use sqlx::PgPool;

#[derive(sqlx::FromRow)]
struct EventRow {
    id: uuid::Uuid,
    name: String,
    venue: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    capacity: i32,
    status: String,
    ticket_price: f64,
    cancellation_fee: f64,
    maximum_tickets_per_booking: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EventRow {
    fn into_event(self) -> Result<Event> {
        Ok(Event {
            id: EventId(self.id),
            name: self.name,
            venue: self.venue,
            start_time: self.start_time,
            end_time: self.end_time,
            capacity: self.capacity,
            status: EventStatus::parse(&self.status)?,
            ticket_price: self.ticket_price,
            cancellation_fee: self.cancellation_fee,
            max_tickets_per_booking: self.maximum_tickets_per_booking,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Postgres event catalog.
#[derive(Clone)]
pub struct PgEventCatalog {
    pool: PgPool,
}

impl PgEventCatalog {
    /// Create a catalog over the shared pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl EventCatalog for PgEventCatalog {
    async fn get(&self, event: EventId) -> Result<Option<Event>> {
        // Reservation quantities live in event_capacity, not here.
        let row: Option<EventRow> = sqlx::query_as(
            r"
            SELECT id, name, venue, start_time, end_time, capacity, status,
                   ticket_price, cancellation_fee, maximum_tickets_per_booking,
                   created_at, updated_at
            FROM events
            WHERE id = $1
            ",
        )
        .bind(event.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(CoreError::database)?;
        row.map(EventRow::into_event).transpose()
    }

    async fn update_status(&self, event: EventId, status: EventStatus) -> Result<()> {
        let result =
            sqlx::query("UPDATE events SET status = $1, updated_at = now() WHERE id = $2")
                .bind(status.as_str())
                .bind(event.0)
                .execute(&self.pool)
                .await
                .map_err(CoreError::database)?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound("event"));
        }
        Ok(())
    }

    async fn capacity_records(&self) -> Result<Vec<CapacityRecord>> {
        let rows: Vec<(uuid::Uuid, i32, i32, i32)> = sqlx::query_as(
            "SELECT event_id, capacity, reserved_count, held_count FROM event_capacity",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(CoreError::database)?;
        Ok(rows
            .into_iter()
            .map(|(event_id, capacity, reserved_count, held_count)| CapacityRecord {
                event_id: EventId(event_id),
                capacity,
                reserved_count,
                held_count,
            })
            .collect())
    }

    async fn seed_missing_capacity(&self) -> Result<u64> {
        // Derive the reserved count from the ledger itself: the sum of
        // seats across booked bookings is the authoritative quantity.
        let result = sqlx::query(
            r"
            INSERT INTO event_capacity (event_id, capacity, reserved_count, held_count)
            SELECT e.id, e.capacity, COALESCE(b.reserved, 0), 0
            FROM events e
            LEFT JOIN event_capacity ec ON ec.event_id = e.id
            LEFT JOIN (
                SELECT event_id, SUM(cardinality(seats))::int AS reserved
                FROM bookings
                WHERE status = 'booked'
                GROUP BY event_id
            ) b ON b.event_id = e.id
            WHERE ec.event_id IS NULL
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(CoreError::database)?;
        Ok(result.rows_affected())
    }

    async fn expire_ended(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r"
            UPDATE events
            SET status = 'expired', updated_at = now()
            WHERE end_time < $1 AND status IN ('upcoming', 'ongoing')
            ",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(CoreError::database)?;
        Ok(result.rows_affected())
    }
}
