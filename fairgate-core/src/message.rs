//! Finalize stream message envelope.
//!
//! Messages on the `bookings` topic are JSON objects keyed by event id
//! so that all messages for one event land in one partition. The
//! envelope is intentionally self-contained: the worker can act on a
//! redelivered message without consulting the producer.

use crate::error::CoreError;
use crate::ids::{BookingId, EventId, UserId};
use serde::{Deserialize, Serialize};

/// Discriminator for finalize stream messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A freshly admitted booking needs a payment request and a
    /// scheduled timeout.
    FinalizeBooking,
    /// A pending booking's grace window elapsed without payment.
    BookingTimeout,
}

/// Payload of a finalize stream message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeMessage {
    /// Message discriminator.
    #[serde(rename = "type")]
    pub kind: MessageKind,

    /// Booking this message is about.
    pub booking_id: BookingId,

    /// Owning event; also the partition key.
    pub event_id: EventId,

    /// Owning user.
    pub user_id: UserId,

    /// Seat labels of the booking.
    pub seats: Vec<String>,

    /// Replay guard of the originating request, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub idempotency_key: Option<String>,
}

impl FinalizeMessage {
    /// Build a `finalize_booking` message for a freshly admitted
    /// booking.
    #[must_use]
    pub fn finalize(
        booking_id: BookingId,
        event_id: EventId,
        user_id: UserId,
        seats: Vec<String>,
        idempotency_key: Option<String>,
    ) -> Self {
        Self {
            kind: MessageKind::FinalizeBooking,
            booking_id,
            event_id,
            user_id,
            seats,
            idempotency_key,
        }
    }

    /// Build a `booking_timeout` message for a booking whose grace
    /// window elapsed.
    #[must_use]
    pub fn timeout(
        booking_id: BookingId,
        event_id: EventId,
        user_id: UserId,
        seats: Vec<String>,
    ) -> Self {
        Self {
            kind: MessageKind::BookingTimeout,
            booking_id,
            event_id,
            user_id,
            seats,
            idempotency_key: None,
        }
    }

    /// Serialize to the JSON wire format.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Fatal`] if serialization fails (only
    /// possible with non-string map keys, which this type never has).
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(|e| CoreError::Fatal(format!("encode message: {e}")))
    }

    /// Deserialize from the JSON wire format.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Fatal`] for malformed payloads; the caller
    /// forwards those to the dead-letter topic.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(bytes).map_err(|e| CoreError::Fatal(format!("decode message: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_uses_snake_case_type_tag() {
        let msg = FinalizeMessage::finalize(
            BookingId::new(),
            EventId::new(),
            UserId::new(),
            vec!["A-1".into(), "A-2".into()],
            Some("key-1".into()),
        );
        let value: serde_json::Value = serde_json::from_slice(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(value["type"], "finalize_booking");
        assert_eq!(value["seats"][1], "A-2");
        assert_eq!(value["idempotency_key"], "key-1");
    }

    #[test]
    fn timeout_omits_absent_idempotency_key() {
        let msg =
            FinalizeMessage::timeout(BookingId::new(), EventId::new(), UserId::new(), vec![]);
        let value: serde_json::Value = serde_json::from_slice(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(value["type"], "booking_timeout");
        assert!(value.get("idempotency_key").is_none());
    }

    #[test]
    fn roundtrip() {
        let msg = FinalizeMessage::finalize(
            BookingId::new(),
            EventId::new(),
            UserId::new(),
            vec!["B-7".into()],
            None,
        );
        let decoded = FinalizeMessage::from_bytes(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn malformed_payload_is_fatal() {
        let err = FinalizeMessage::from_bytes(b"{\"type\":\"mystery\"}").unwrap_err();
        assert!(matches!(err, CoreError::Fatal(_)));
    }

    #[test]
    fn decodes_payload_without_optional_fields() {
        // A producer speaking the documented wire format but omitting
        // the optional key must still decode.
        let raw = format!(
            r#"{{"type":"booking_timeout","booking_id":"{}","event_id":"{}","user_id":"{}","seats":["C-3"]}}"#,
            uuid::Uuid::new_v4(),
            uuid::Uuid::new_v4(),
            uuid::Uuid::new_v4(),
        );
        let msg = FinalizeMessage::from_bytes(raw.as_bytes()).unwrap();
        assert_eq!(msg.kind, MessageKind::BookingTimeout);
        assert_eq!(msg.seats, vec!["C-3".to_string()]);
        assert!(msg.idempotency_key.is_none());
    }
}
