//! Booking record and lifecycle states.

use crate::error::CoreError;
use crate::ids::{BookingId, EventId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a booking.
///
/// ```text
/// pending ──payment──> booked ──cancel──> cancelled
///    │
///    └──timeout/cancel──> cancelled
/// ```
///
/// `waitlisted` and `expired` are terminal records kept for audit; a
/// waitlisted user is promoted by creating a *new* pending booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Admitted, awaiting payment within the grace window.
    Pending,
    /// Paid and confirmed; seats are booked.
    Booked,
    /// Cancelled by the user or by the timeout path.
    Cancelled,
    /// Recorded on the waitlist, never admitted.
    Waitlisted,
    /// The event ended before the booking resolved.
    Expired,
}

impl BookingStatus {
    /// Database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Booked => "booked",
            Self::Cancelled => "cancelled",
            Self::Waitlisted => "waitlisted",
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
            "pending" => Ok(Self::Pending),
            "booked" => Ok(Self::Booked),
            "cancelled" => Ok(Self::Cancelled),
            "waitlisted" => Ok(Self::Waitlisted),
            "expired" => Ok(Self::Expired),
            _ => Err(CoreError::Fatal(format!("unknown booking status: {s}"))),
        }
    }
}

/// Payment state of a booking, driven by the external payment callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// No payment received yet.
    Pending,
    /// Payment completed.
    Paid,
    /// Payment attempt failed.
    Failed,
    /// Payment refunded after cancellation.
    Refunded,
}

impl PaymentStatus {
    /// Database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }

    /// Parse from the database string representation.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Fatal`] for an unknown status string.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            _ => Err(CoreError::Fatal(format!("unknown payment status: {s}"))),
        }
    }
}

/// A booking: the durable record of one admission through the
/// two-phase reservation protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Unique booking identifier.
    pub id: BookingId,

    /// Owning user.
    pub user_id: UserId,

    /// Owning event. The ledger is partitioned by this.
    pub event_id: EventId,

    /// Lifecycle state.
    pub status: BookingStatus,

    /// Seat labels this booking occupies. Non-empty for
    /// pending/booked bookings.
    pub seats: Vec<String>,

    /// Replay guard, unique per event when present.
    pub idempotency_key: Option<String>,

    /// Payment state.
    pub payment_status: PaymentStatus,

    /// Amount actually paid (0 until the payment callback lands).
    pub amount_paid: f64,

    /// Monotonic version counter bumped by every update.
    pub version: i32,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last-update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// `true` while the booking holds inventory awaiting payment.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == BookingStatus::Pending
    }

    /// Number of seats this booking occupies.
    #[must_use]
    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_roundtrip() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Booked,
            BookingStatus::Cancelled,
            BookingStatus::Waitlisted,
            BookingStatus::Expired,
        ] {
            assert_eq!(BookingStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn payment_status_roundtrip() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::Failed,
            PaymentStatus::Refunded,
        ] {
            assert_eq!(PaymentStatus::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_fatal() {
        assert!(matches!(
            BookingStatus::parse("limbo"),
            Err(CoreError::Fatal(_))
        ));
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&BookingStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
