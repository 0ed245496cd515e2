//! Per-event seat state machine.

use crate::error::CoreError;
use crate::ids::{BookingId, EventId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of a single seat.
///
/// The only legal edges are `available → held → booked`,
/// `held → available` (release) and `booked → available` (cancel of a
/// booked booking). Every transition is guarded by the current status
/// in SQL, so a stale update affects zero rows instead of corrupting
/// the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    /// Free for the next admission.
    Available,
    /// Held by a pending booking until its grace window closes.
    Held,
    /// Sold to a booked booking.
    Booked,
}

impl SeatStatus {
    /// Database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Held => "held",
            Self::Booked => "booked",
        }
    }

    /// Parse from the database string representation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Fatal`] for an unknown status string.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "available" => Ok(Self::Available),
            "held" => Ok(Self::Held),
            "booked" => Ok(Self::Booked),
            _ => Err(CoreError::Fatal(format!("unknown seat status: {s}"))),
        }
    }
}

/// A seat row: one physical seat of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seat {
    /// Unique seat identifier.
    pub id: uuid::Uuid,

    /// Owning event.
    pub event_id: EventId,

    /// Seat label, unique within the event (e.g. `"A-12"`).
    pub label: String,

    /// Current state.
    pub status: SeatStatus,

    /// Booking holding or owning this seat. Set iff status is
    /// `held` or `booked`.
    pub held_by: Option<BookingId>,

    /// Hold expiry for `held` seats; informational, enforcement is the
    /// timeout path.
    pub held_until: Option<DateTime<Utc>>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last-update timestamp.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for status in [SeatStatus::Available, SeatStatus::Held, SeatStatus::Booked] {
            assert_eq!(SeatStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_rejected() {
        assert!(SeatStatus::parse("folded").is_err());
    }
}
