//! Mock event catalog and waitlist.

use crate::providers::{EventCatalog, WaitlistStore};
use chrono::{DateTime, Duration, Utc};
use fairgate_core::{
    CapacityRecord, CoreError, Event, EventId, EventStatus, Result, UserId, WaitlistEntry,
    WaitlistEntryId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory event catalog.
#[derive(Debug, Clone, Default)]
pub struct MockEventCatalog {
    events: Arc<Mutex<HashMap<EventId, Event>>>,
    capacity: Arc<Mutex<HashMap<EventId, CapacityRecord>>>,
}

impl MockEventCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and insert an upcoming event with sensible defaults.
    #[must_use]
    pub fn seed_event(&self, capacity: i32, ticket_price: f64) -> Event {
        let now = Utc::now();
        let event = Event {
            id: EventId::new(),
            name: "Test Event".to_string(),
            venue: "Test Hall".to_string(),
            start_time: now + Duration::days(7),
            end_time: now + Duration::days(8),
            capacity,
            status: EventStatus::Upcoming,
            ticket_price,
            cancellation_fee: 5.0,
            max_tickets_per_booking: 4,
            created_at: now,
            updated_at: now,
        };
        self.events.lock().unwrap().insert(event.id, event.clone());
        event
    }

    /// Insert a fully specified event.
    pub fn insert(&self, event: Event) {
        self.events.lock().unwrap().insert(event.id, event);
    }

    /// Set the authoritative capacity record for an event.
    pub fn set_capacity_record(&self, record: CapacityRecord) {
        self.capacity.lock().unwrap().insert(record.event_id, record);
    }

    /// Current status of an event (for assertions).
    #[must_use]
    pub fn status_of(&self, event: EventId) -> Option<EventStatus> {
        self.events.lock().unwrap().get(&event).map(|e| e.status)
    }
}

impl EventCatalog for MockEventCatalog {
    async fn get(&self, event: EventId) -> Result<Option<Event>> {
        Ok(self.events.lock().unwrap().get(&event).cloned())
    }

    async fn update_status(&self, event: EventId, status: EventStatus) -> Result<()> {
        let mut events = self.events.lock().unwrap();
        let record = events.get_mut(&event).ok_or(CoreError::NotFound("event"))?;
        record.status = status;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn capacity_records(&self) -> Result<Vec<CapacityRecord>> {
        Ok(self.capacity.lock().unwrap().values().copied().collect())
    }

    async fn seed_missing_capacity(&self) -> Result<u64> {
        let events = self.events.lock().unwrap();
        let mut capacity = self.capacity.lock().unwrap();
        let mut seeded = 0;
        for event in events.values() {
            if !capacity.contains_key(&event.id) {
                capacity.insert(
                    event.id,
                    CapacityRecord {
                        event_id: event.id,
                        capacity: event.capacity,
                        reserved_count: 0,
                        held_count: 0,
                    },
                );
                seeded += 1;
            }
        }
        Ok(seeded)
    }

    async fn expire_ended(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut events = self.events.lock().unwrap();
        let mut expired = 0;
        for event in events.values_mut() {
            if event.end_time < now
                && matches!(event.status, EventStatus::Upcoming | EventStatus::Ongoing)
            {
                event.status = EventStatus::Expired;
                expired += 1;
            }
        }
        Ok(expired)
    }
}

/// In-memory waitlist.
#[derive(Debug, Clone, Default)]
pub struct MockWaitlist {
    entries: Arc<Mutex<Vec<WaitlistEntry>>>,
}

impl MockWaitlist {
    /// Create an empty waitlist.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries (for assertions).
    #[must_use]
    pub fn entries(&self) -> Vec<WaitlistEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl WaitlistStore for MockWaitlist {
    async fn add(&self, event: EventId, user: UserId) -> Result<i32> {
        let mut entries = self.entries.lock().unwrap();
        let position = entries
            .iter()
            .filter(|e| e.event_id == event && !e.opted_out)
            .map(|e| e.position)
            .max()
            .unwrap_or(0)
            + 1;
        entries.push(WaitlistEntry {
            id: WaitlistEntryId::new(),
            event_id: event,
            user_id: user,
            position,
            opted_out: false,
            notified_at: None,
            created_at: Utc::now(),
        });
        Ok(position)
    }

    async fn next_active(&self, event: EventId) -> Result<Option<WaitlistEntry>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_id == event && !e.opted_out)
            .min_by_key(|e| e.position)
            .cloned())
    }

    async fn remove(&self, id: WaitlistEntryId) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return Err(CoreError::NotFound("waitlist entry"));
        }
        Ok(())
    }

    async fn opt_out(&self, event: EventId, user: UserId) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let mut found = false;
        for entry in entries
            .iter_mut()
            .filter(|e| e.event_id == event && e.user_id == user)
        {
            entry.opted_out = true;
            found = true;
        }
        if !found {
            return Err(CoreError::NotFound("waitlist entry"));
        }
        Ok(())
    }

    async fn mark_notified(&self, id: WaitlistEntryId) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(CoreError::NotFound("waitlist entry"))?;
        entry.notified_at = Some(Utc::now());
        Ok(())
    }

    async fn count(&self, event: EventId) -> Result<i64> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_id == event && !e.opted_out)
            .count() as i64)
    }

    async fn list_by_event(
        &self,
        event: EventId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<WaitlistEntry>> {
        let mut entries: Vec<WaitlistEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.event_id == event)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.position);
        Ok(entries
            .into_iter()
            .skip(usize::try_from(offset.max(0)).unwrap_or(0))
            .take(usize::try_from(limit.max(0)).unwrap_or(0))
            .collect())
    }
}
