//! Event record, read-mostly to the booking core.
//!
//! Events are created and edited by an external admin surface. The
//! core reads them for validation and pricing and updates `status`
//! when an event expires. Reservation quantities live in
//! [`CapacityRecord`], which the ledger's finalize/cancel
//! transactions maintain.

use crate::error::CoreError;
use crate::ids::EventId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Announced, bookable.
    Upcoming,
    /// Currently running.
    Ongoing,
    /// Cancelled by the organizer.
    Cancelled,
    /// Past its end time.
    Expired,
}

impl EventStatus {
    /// Database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Ongoing => "ongoing",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// Parse from the database string representation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Fatal`] for an unknown status string.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "upcoming" => Ok(Self::Upcoming),
            "ongoing" => Ok(Self::Ongoing),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            _ => Err(CoreError::Fatal(format!("unknown event status: {s}"))),
        }
    }
}

/// An event with bounded seat inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,

    /// Display name.
    pub name: String,

    /// Venue name.
    pub venue: String,

    /// Scheduled start.
    pub start_time: DateTime<Utc>,

    /// Scheduled end; bookings past this fail validation.
    pub end_time: DateTime<Utc>,

    /// Total seat capacity.
    pub capacity: i32,

    /// Lifecycle state.
    pub status: EventStatus,

    /// Price per ticket.
    pub ticket_price: f64,

    /// Fee deducted from refunds on cancellation.
    pub cancellation_fee: f64,

    /// Upper bound on seats per booking request.
    pub max_tickets_per_booking: i32,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last-update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// `true` once the event's end time has passed.
    #[must_use]
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end_time < now
    }
}

/// Authoritative (capacity, reserved, held) triple used by the
/// reconciler as the truth reference for the inventory counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacityRecord {
    /// Event this record describes.
    pub event_id: EventId,

    /// Total seat capacity.
    pub capacity: i32,

    /// Seats consumed by finalized bookings.
    pub reserved_count: i32,

    /// Seats consumed by pending holds.
    pub held_count: i32,
}

impl CapacityRecord {
    /// The value the inventory counter should hold for this event.
    #[must_use]
    pub const fn desired_remaining(&self) -> i32 {
        self.capacity - self.reserved_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn status_roundtrip() {
        for status in [
            EventStatus::Upcoming,
            EventStatus::Ongoing,
            EventStatus::Cancelled,
            EventStatus::Expired,
        ] {
            assert_eq!(EventStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn ended_event_detection() {
        let now = Utc::now();
        let event = Event {
            id: EventId::new(),
            name: "show".into(),
            venue: "hall".into(),
            start_time: now - Duration::hours(3),
            end_time: now - Duration::hours(1),
            capacity: 100,
            status: EventStatus::Upcoming,
            ticket_price: 25.0,
            cancellation_fee: 5.0,
            max_tickets_per_booking: 4,
            created_at: now,
            updated_at: now,
        };
        assert!(event.has_ended(now));
        assert!(!event.has_ended(now - Duration::hours(2)));
    }

    #[test]
    fn desired_remaining_from_capacity_pair() {
        let record = CapacityRecord {
            event_id: EventId::new(),
            capacity: 10,
            reserved_count: 3,
            held_count: 2,
        };
        assert_eq!(record.desired_remaining(), 7);
    }
}
