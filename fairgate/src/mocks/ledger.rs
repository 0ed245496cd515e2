//! Mock booking ledger with seat tracking.
//!
//! Mirrors the transactional semantics of the Postgres ledger closely
//! enough for the scenario tests: idempotency replay, seat-hold
//! conflicts, pending→booked finalize and cancel with seat release.

use crate::providers::BookingLedger;
use chrono::{DateTime, Utc};
use fairgate_core::{
    Booking, BookingId, BookingStatus, CoreError, EventId, PaymentStatus, Result, SeatStatus,
    UserId,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct LedgerInner {
    bookings: HashMap<BookingId, Booking>,
    seats: HashMap<(EventId, String), (SeatStatus, Option<BookingId>)>,
}

/// In-memory booking ledger.
#[derive(Debug, Clone, Default)]
pub struct MockLedger {
    inner: Arc<Mutex<LedgerInner>>,
    fail_next_create: Arc<AtomicBool>,
}

impl MockLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the seat set for an event, all available.
    pub fn seed_seats(&self, event: EventId, labels: &[&str]) {
        let mut inner = self.inner.lock().unwrap();
        for label in labels {
            inner
                .seats
                .insert((event, (*label).to_string()), (SeatStatus::Available, None));
        }
    }

    /// Current status of one seat (for assertions).
    #[must_use]
    pub fn seat_state(&self, event: EventId, label: &str) -> Option<(SeatStatus, Option<BookingId>)> {
        self.inner
            .lock()
            .unwrap()
            .seats
            .get(&(event, label.to_string()))
            .copied()
    }

    /// Fetch a booking synchronously (for assertions).
    #[must_use]
    pub fn booking(&self, id: BookingId) -> Option<Booking> {
        self.inner.lock().unwrap().bookings.get(&id).cloned()
    }

    /// Bookings of an event in a given status (for invariant checks).
    #[must_use]
    pub fn bookings_with_status(&self, event: EventId, status: BookingStatus) -> Vec<Booking> {
        self.inner
            .lock()
            .unwrap()
            .bookings
            .values()
            .filter(|b| b.event_id == event && b.status == status)
            .cloned()
            .collect()
    }

    /// Make the next `create_pending` fail with a transient error.
    pub fn fail_next_create(&self) {
        self.fail_next_create.store(true, Ordering::SeqCst);
    }
}

fn now_pair() -> (DateTime<Utc>, DateTime<Utc>) {
    let now = Utc::now();
    (now, now)
}

impl BookingLedger for MockLedger {
    async fn create_pending(
        &self,
        user: UserId,
        event: EventId,
        idempotency_key: Option<&str>,
        seats: &[String],
        _hold_until: DateTime<Utc>,
    ) -> Result<Booking> {
        if self.fail_next_create.swap(false, Ordering::SeqCst) {
            return Err(CoreError::Transient("ledger unavailable".to_string()));
        }

        let mut inner = self.inner.lock().unwrap();

        if let Some(key) = idempotency_key {
            if let Some(existing) = inner
                .bookings
                .values()
                .find(|b| b.event_id == event && b.idempotency_key.as_deref() == Some(key))
            {
                return Ok(existing.clone());
            }
        }

        for label in seats {
            match inner.seats.get(&(event, label.clone())) {
                Some((SeatStatus::Available, _)) => {}
                _ => {
                    return Err(CoreError::Conflict(format!("seat {label} not available")));
                }
            }
        }

        let (created_at, updated_at) = now_pair();
        let booking = Booking {
            id: BookingId::new(),
            user_id: user,
            event_id: event,
            status: BookingStatus::Pending,
            seats: seats.to_vec(),
            idempotency_key: idempotency_key.map(str::to_string),
            payment_status: PaymentStatus::Pending,
            amount_paid: 0.0,
            version: 1,
            created_at,
            updated_at,
        };

        for label in seats {
            inner
                .seats
                .insert((event, label.clone()), (SeatStatus::Held, Some(booking.id)));
        }
        inner.bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get(&self, booking: BookingId) -> Result<Option<Booking>> {
        Ok(self.inner.lock().unwrap().bookings.get(&booking).cloned())
    }

    async fn get_by_idempotency(&self, event: EventId, key: &str) -> Result<Option<Booking>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .bookings
            .values()
            .find(|b| b.event_id == event && b.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    async fn finalize(
        &self,
        booking: BookingId,
        seats: &[String],
        amount_paid: f64,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let Some(record) = inner.bookings.get(&booking) else {
            return Err(CoreError::NotFound("booking"));
        };
        if record.status != BookingStatus::Pending {
            return Ok(());
        }
        let event = record.event_id;

        let record = inner.bookings.get_mut(&booking).unwrap();
        record.status = BookingStatus::Booked;
        record.payment_status = PaymentStatus::Paid;
        record.amount_paid = amount_paid;
        record.version += 1;
        record.updated_at = Utc::now();

        for label in seats {
            inner
                .seats
                .insert((event, label.clone()), (SeatStatus::Booked, Some(booking)));
        }
        Ok(())
    }

    async fn cancel(&self, booking: BookingId) -> Result<(Booking, bool)> {
        let mut inner = self.inner.lock().unwrap();
        let Some(record) = inner.bookings.get(&booking).cloned() else {
            return Err(CoreError::NotFound("booking"));
        };

        match record.status {
            BookingStatus::Pending | BookingStatus::Booked => {}
            BookingStatus::Cancelled => return Ok((record, false)),
            BookingStatus::Waitlisted | BookingStatus::Expired => {
                return Err(CoreError::Conflict(format!(
                    "booking in state {} cannot be cancelled",
                    record.status.as_str()
                )));
            }
        }

        let was_booked = record.status == BookingStatus::Booked;
        for label in &record.seats {
            inner
                .seats
                .insert((record.event_id, label.clone()), (SeatStatus::Available, None));
        }
        let stored = inner.bookings.get_mut(&booking).unwrap();
        stored.status = BookingStatus::Cancelled;
        stored.version += 1;
        stored.updated_at = Utc::now();
        let cancelled = stored.clone();
        Ok((cancelled, was_booked))
    }

    async fn update_payment_status(
        &self,
        booking: BookingId,
        status: PaymentStatus,
        amount: f64,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let record = inner
            .bookings
            .get_mut(&booking)
            .ok_or(CoreError::NotFound("booking"))?;
        record.payment_status = status;
        record.amount_paid = amount;
        record.version += 1;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn status(&self, booking: BookingId) -> Result<Option<BookingStatus>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .bookings
            .get(&booking)
            .map(|b| b.status))
    }

    async fn list_by_user(&self, user: UserId, limit: i64, offset: i64) -> Result<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .inner
            .lock()
            .unwrap()
            .bookings
            .values()
            .filter(|b| b.user_id == user)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(bookings, limit, offset))
    }

    async fn list_by_event(
        &self,
        event: EventId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .inner
            .lock()
            .unwrap()
            .bookings
            .values()
            .filter(|b| b.event_id == event)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page(bookings, limit, offset))
    }
}

fn page(items: Vec<Booking>, limit: i64, offset: i64) -> Vec<Booking> {
    items
        .into_iter()
        .skip(usize::try_from(offset.max(0)).unwrap_or(0))
        .take(usize::try_from(limit.max(0)).unwrap_or(0))
        .collect()
}
