//! Typed identifiers.
//!
//! Every entity gets its own uuid newtype so that a booking id cannot
//! be passed where an event id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub uuid::Uuid);

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Parse an identifier from its string form.
            ///
            /// # Errors
            ///
            /// Returns error if `s` is not a valid UUID.
            pub fn parse(s: &str) -> Result<Self, uuid::Error> {
                uuid::Uuid::parse_str(s).map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(id: uuid::Uuid) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(
    /// Unique identifier for an event.
    EventId
);
id_type!(
    /// Unique identifier for a booking.
    BookingId
);
id_type!(
    /// Unique identifier for a user.
    UserId
);
id_type!(
    /// Unique identifier for a waitlist entry.
    WaitlistEntryId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(BookingId::new(), BookingId::new());
        assert_ne!(EventId::new(), EventId::new());
    }

    #[test]
    fn id_parse_roundtrip() {
        let id = EventId::new();
        let parsed = EventId::parse(&id.to_string()).expect("valid uuid");
        assert_eq!(id, parsed);
    }

    #[test]
    fn id_parse_rejects_garbage() {
        assert!(BookingId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn id_serializes_transparently() {
        let id = UserId::new();
        let json = serde_json::to_string(&id).expect("serializable");
        assert_eq!(json, format!("\"{}\"", id.0));
    }
}
