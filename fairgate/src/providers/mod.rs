//! Provider traits: the seams between the booking core and its
//! infrastructure.
//!
//! Each trait abstracts one external dependency (Redis counter, ledger,
//! Kafka producer, SMTP relay, …). Production implementations live in
//! [`crate::stores`], [`crate::providers::smtp`] and
//! `fairgate-stream`; in-memory implementations for tests live in
//! [`crate::mocks`].

pub mod console;
pub mod smtp;

use chrono::{DateTime, Utc};
use fairgate_core::{
    Booking, BookingId, BookingStatus, CapacityRecord, Event, EventId, EventStatus,
    FinalizeMessage, PaymentStatus, Result, UserId, WaitlistEntry, WaitlistEntryId,
};
use std::future::Future;

pub use console::ConsoleNotifier;
pub use smtp::SmtpNotifier;

/// State of a timeout record in the registry.
///
/// By convention a missing record reads as [`Processing`]: a lost
/// record must not short-circuit the timeout, and the timeout path
/// re-checks the booking's status before acting, so the conservative
/// default is harmless.
///
/// [`Processing`]: TimeoutState::Processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutState {
    /// The grace window is open; the timeout path will fire.
    Processing,
    /// Payment completed; the scheduled timeout must stand down.
    Processed,
}

/// Fast per-event admission counter (C1).
///
/// `reserve` is the admission critical path and must be a single
/// indivisible step; everything else is best-effort and repaired by
/// the reconciler.
pub trait InventoryCounter: Send + Sync {
    /// Set `remaining` to `capacity`. Used on event creation and by
    /// the reconciler to seed missing counters.
    fn initialize(
        &self,
        event: EventId,
        capacity: i64,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Atomically admit `n` seats: decrement and return `true` when
    /// `remaining >= n`, otherwise return `false` without mutation.
    fn reserve(&self, event: EventId, n: i64) -> impl Future<Output = Result<bool>> + Send;

    /// Atomically return `n` seats. No upper-bound check; drift is the
    /// reconciler's problem.
    fn release(&self, event: EventId, n: i64) -> impl Future<Output = Result<()>> + Send;

    /// Current remaining count; 0 when the counter is unknown.
    fn remaining(&self, event: EventId) -> impl Future<Output = Result<i64>> + Send;
}

/// Short-TTL coordination flags for pending-booking timeouts (C7).
pub trait TimeoutStore: Send + Sync {
    /// Record that (event, booking) entered its grace window.
    fn begin(
        &self,
        event: EventId,
        booking: BookingId,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Read the record; a missing key reads as
    /// [`TimeoutState::Processing`].
    fn get(
        &self,
        event: EventId,
        booking: BookingId,
    ) -> impl Future<Output = Result<TimeoutState>> + Send;

    /// Mark that payment landed before the timeout fired.
    fn mark_processed(
        &self,
        event: EventId,
        booking: BookingId,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove the record after the timeout path handled the key.
    fn delete(
        &self,
        event: EventId,
        booking: BookingId,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Durable, transactional booking ledger (C2).
pub trait BookingLedger: Send + Sync {
    /// Insert a pending booking and hold its seats, all-or-nothing.
    ///
    /// When `idempotency_key` is present and a booking already exists
    /// for (event, key), the existing record is returned unchanged.
    /// Fails with a conflict when any requested seat is not available.
    fn create_pending(
        &self,
        user: UserId,
        event: EventId,
        idempotency_key: Option<&str>,
        seats: &[String],
        hold_until: DateTime<Utc>,
    ) -> impl Future<Output = Result<Booking>> + Send;

    /// Fetch by id.
    fn get(&self, booking: BookingId) -> impl Future<Output = Result<Option<Booking>>> + Send;

    /// Fetch by (event, idempotency key).
    fn get_by_idempotency(
        &self,
        event: EventId,
        key: &str,
    ) -> impl Future<Output = Result<Option<Booking>>> + Send;

    /// Transactional `pending → booked`: payment paid, seats booked,
    /// reserved counter incremented. A no-op unless the booking is
    /// currently pending.
    fn finalize(
        &self,
        booking: BookingId,
        seats: &[String],
        amount_paid: f64,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Transactional cancel under row lock. Releases the booking's
    /// seats; decrements the persisted reserved counter iff the prior
    /// status was `booked`. Returns the booking and that flag so the
    /// caller knows whether to release admission tokens.
    fn cancel(
        &self,
        booking: BookingId,
    ) -> impl Future<Output = Result<(Booking, bool)>> + Send;

    /// Set payment status and amount unconditionally.
    fn update_payment_status(
        &self,
        booking: BookingId,
        status: PaymentStatus,
        amount: f64,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Current lifecycle status, `None` when the booking is unknown.
    fn status(
        &self,
        booking: BookingId,
    ) -> impl Future<Output = Result<Option<BookingStatus>>> + Send;

    /// Bookings of one user, newest first.
    fn list_by_user(
        &self,
        user: UserId,
        limit: i64,
        offset: i64,
    ) -> impl Future<Output = Result<Vec<Booking>>> + Send;

    /// Bookings of one event, newest first.
    fn list_by_event(
        &self,
        event: EventId,
        limit: i64,
        offset: i64,
    ) -> impl Future<Output = Result<Vec<Booking>>> + Send;
}

/// Read-mostly event catalog plus the persisted capacity pairs the
/// reconciler treats as authoritative.
pub trait EventCatalog: Send + Sync {
    /// Fetch an event.
    fn get(&self, event: EventId) -> impl Future<Output = Result<Option<Event>>> + Send;

    /// Persist a lifecycle status change (e.g. `expired`).
    fn update_status(
        &self,
        event: EventId,
        status: EventStatus,
    ) -> impl Future<Output = Result<()>> + Send;

    /// All (capacity, reserved, held) records for reconciliation.
    fn capacity_records(&self) -> impl Future<Output = Result<Vec<CapacityRecord>>> + Send;

    /// Insert `event_capacity` rows for events that lack one.
    /// Returns the number of rows created.
    fn seed_missing_capacity(&self) -> impl Future<Output = Result<u64>> + Send;

    /// Mark events whose end time passed as `expired`. Returns the
    /// number of rows updated.
    fn expire_ended(&self, now: DateTime<Utc>) -> impl Future<Output = Result<u64>> + Send;
}

/// Per-event FIFO waitlist with opt-out (C4).
pub trait WaitlistStore: Send + Sync {
    /// Append a user; returns their position (max active position + 1,
    /// serialized per event).
    fn add(&self, event: EventId, user: UserId) -> impl Future<Output = Result<i32>> + Send;

    /// Smallest-position entry with `opted_out = false`, not removed.
    fn next_active(
        &self,
        event: EventId,
    ) -> impl Future<Output = Result<Option<WaitlistEntry>>> + Send;

    /// Delete an entry (promotion consumed it).
    fn remove(&self, id: WaitlistEntryId) -> impl Future<Output = Result<()>> + Send;

    /// Flag a user's entry as opted out; the position is retired.
    fn opt_out(&self, event: EventId, user: UserId) -> impl Future<Output = Result<()>> + Send;

    /// Stamp `notified_at` on an entry.
    fn mark_notified(&self, id: WaitlistEntryId) -> impl Future<Output = Result<()>> + Send;

    /// Count of active (non-opted-out) entries.
    fn count(&self, event: EventId) -> impl Future<Output = Result<i64>> + Send;

    /// Page through an event's entries in position order.
    fn list_by_event(
        &self,
        event: EventId,
        limit: i64,
        offset: i64,
    ) -> impl Future<Output = Result<Vec<WaitlistEntry>>> + Send;
}

/// Publisher for the finalize stream.
pub trait FinalizePublisher: Send + Sync {
    /// Publish a message keyed by its event id.
    fn publish(&self, message: &FinalizeMessage) -> impl Future<Output = Result<()>> + Send;
}

impl FinalizePublisher for fairgate_stream::BookingProducer {
    async fn publish(&self, message: &FinalizeMessage) -> Result<()> {
        Self::publish(self, message).await.map_err(Into::into)
    }
}

/// Outbound user notifications.
///
/// Delivery is best-effort and at-least-once; the booking state
/// machine never depends on an email having arrived.
pub trait Notifier: Send + Sync {
    /// Ask the user to pay for a pending booking within the grace
    /// window.
    fn send_payment_request(
        &self,
        to: &str,
        event_name: &str,
        amount: f64,
        payment_link: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Confirm a cancellation and point at the refund flow.
    fn send_cancellation(
        &self,
        to: &str,
        cancellation_fee: f64,
        refund_link: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Tell a waitlisted user they were promoted.
    fn send_waitlist_promotion(
        &self,
        to: &str,
        event_name: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Minimal read interface to the external user system: id → email.
pub trait UserDirectory: Send + Sync {
    /// Email address for a user id.
    fn email_for(&self, user: UserId) -> impl Future<Output = Result<String>> + Send;
}

/// Config-selected notifier: SMTP in production, console in
/// development.
#[derive(Clone)]
pub enum MailNotifier {
    /// Real SMTP delivery.
    Smtp(SmtpNotifier),
    /// Log-only delivery for local development.
    Console(ConsoleNotifier),
}

impl Notifier for MailNotifier {
    async fn send_payment_request(
        &self,
        to: &str,
        event_name: &str,
        amount: f64,
        payment_link: &str,
    ) -> Result<()> {
        match self {
            Self::Smtp(n) => n.send_payment_request(to, event_name, amount, payment_link).await,
            Self::Console(n) => {
                n.send_payment_request(to, event_name, amount, payment_link).await
            }
        }
    }

    async fn send_cancellation(
        &self,
        to: &str,
        cancellation_fee: f64,
        refund_link: &str,
    ) -> Result<()> {
        match self {
            Self::Smtp(n) => n.send_cancellation(to, cancellation_fee, refund_link).await,
            Self::Console(n) => n.send_cancellation(to, cancellation_fee, refund_link).await,
        }
    }

    async fn send_waitlist_promotion(&self, to: &str, event_name: &str) -> Result<()> {
        match self {
            Self::Smtp(n) => n.send_waitlist_promotion(to, event_name).await,
            Self::Console(n) => n.send_waitlist_promotion(to, event_name).await,
        }
    }
}
