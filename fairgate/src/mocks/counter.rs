//! Mock inventory counter and timeout registry.

use crate::providers::{InventoryCounter, TimeoutState, TimeoutStore};
use fairgate_core::{BookingId, EventId, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory inventory counter. The mutex makes `reserve` exactly as
/// indivisible as the production Lua script.
#[derive(Debug, Clone, Default)]
pub struct MockCounter {
    remaining: Arc<Mutex<HashMap<EventId, i64>>>,
}

impl MockCounter {
    /// Create an empty counter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directly set a counter value (for drift tests).
    pub fn set(&self, event: EventId, value: i64) {
        self.remaining.lock().unwrap().insert(event, value);
    }
}

impl InventoryCounter for MockCounter {
    async fn initialize(&self, event: EventId, capacity: i64) -> Result<()> {
        self.remaining.lock().unwrap().insert(event, capacity);
        Ok(())
    }

    async fn reserve(&self, event: EventId, n: i64) -> Result<bool> {
        let mut remaining = self.remaining.lock().unwrap();
        let current = remaining.entry(event).or_insert(0);
        if *current >= n {
            *current -= n;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn release(&self, event: EventId, n: i64) -> Result<()> {
        *self.remaining.lock().unwrap().entry(event).or_insert(0) += n;
        Ok(())
    }

    async fn remaining(&self, event: EventId) -> Result<i64> {
        Ok(*self.remaining.lock().unwrap().get(&event).unwrap_or(&0))
    }
}

/// In-memory timeout registry.
#[derive(Debug, Clone, Default)]
pub struct MockTimeoutStore {
    records: Arc<Mutex<HashMap<(EventId, BookingId), TimeoutState>>>,
}

impl MockTimeoutStore {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a record currently exists for the key.
    #[must_use]
    pub fn contains(&self, event: EventId, booking: BookingId) -> bool {
        self.records.lock().unwrap().contains_key(&(event, booking))
    }
}

impl TimeoutStore for MockTimeoutStore {
    async fn begin(&self, event: EventId, booking: BookingId) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .insert((event, booking), TimeoutState::Processing);
        Ok(())
    }

    async fn get(&self, event: EventId, booking: BookingId) -> Result<TimeoutState> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&(event, booking))
            .copied()
            .unwrap_or(TimeoutState::Processing))
    }

    async fn mark_processed(&self, event: EventId, booking: BookingId) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .insert((event, booking), TimeoutState::Processed);
        Ok(())
    }

    async fn delete(&self, event: EventId, booking: BookingId) -> Result<()> {
        self.records.lock().unwrap().remove(&(event, booking));
        Ok(())
    }
}
