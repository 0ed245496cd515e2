//! Waitlist entry.

use crate::ids::{EventId, UserId, WaitlistEntryId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One user's place in an event's FIFO waitlist.
///
/// Positions grow monotonically and are never recompacted: an opt-out
/// leaves a hole that readers skip by filtering on `opted_out = false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    /// Unique entry identifier.
    pub id: WaitlistEntryId,

    /// Event being waited on.
    pub event_id: EventId,

    /// Waiting user.
    pub user_id: UserId,

    /// Queue position, ≥ 1, unique within the event.
    pub position: i32,

    /// Set when the user leaves the queue; the position is retired,
    /// not reused.
    pub opted_out: bool,

    /// When a promotion notification was last sent, if any.
    pub notified_at: Option<DateTime<Utc>>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serializes() {
        let entry = WaitlistEntry {
            id: WaitlistEntryId::new(),
            event_id: EventId::new(),
            user_id: UserId::new(),
            position: 3,
            opted_out: false,
            notified_at: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["position"], 3);
        assert_eq!(json["opted_out"], false);
    }
}
