//! Booking coordinator (C5): the synchronous entry point.
//!
//! The coordinator splits the fast in-memory admission decision from
//! the durable ledger write. The caller never blocks on finalize or
//! payment: the ledger insert is the point of durability and the
//! stream publish is best-effort, because the timeout path is the true
//! enforcement mechanism.

use crate::environment::Providers;
use crate::metrics::BookingMetrics;
use crate::providers::{
    BookingLedger, EventCatalog, FinalizePublisher, InventoryCounter, Notifier, TimeoutStore,
    UserDirectory, WaitlistStore,
};
use crate::services::promotion::promote_next;
use chrono::Utc;
use fairgate_core::{
    Booking, BookingId, BookingStatus, CoreError, EventId, EventStatus, FinalizeMessage, Result,
    UserId,
};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of a booking request.
#[derive(Debug, Clone, PartialEq)]
pub enum BookingOutcome {
    /// Admitted; a pending booking was created (HTTP 202).
    Pending(Booking),
    /// Idempotency replay; the prior booking, unchanged (HTTP 200).
    Replayed(Booking),
    /// Event at capacity; the user joined the waitlist (HTTP 200).
    Waitlisted {
        /// Queue position assigned to the user.
        position: i32,
    },
}

/// The booking coordinator.
pub struct BookingCoordinator<L, E, W, C, T, P, N, U>
where
    L: BookingLedger,
    E: EventCatalog,
    W: WaitlistStore,
    C: InventoryCounter,
    T: TimeoutStore,
    P: FinalizePublisher,
    N: Notifier,
    U: UserDirectory,
{
    providers: Arc<Providers<L, E, W, C, T, P, N, U>>,
    payment_url: String,
    grace: Duration,
}

impl<L, E, W, C, T, P, N, U> BookingCoordinator<L, E, W, C, T, P, N, U>
where
    L: BookingLedger,
    E: EventCatalog,
    W: WaitlistStore,
    C: InventoryCounter,
    T: TimeoutStore,
    P: FinalizePublisher,
    N: Notifier,
    U: UserDirectory,
{
    /// Create a coordinator.
    #[must_use]
    pub fn new(
        providers: Arc<Providers<L, E, W, C, T, P, N, U>>,
        payment_url: String,
        grace: Duration,
    ) -> Self {
        Self {
            providers,
            payment_url,
            grace,
        }
    }

    /// Handle a booking request end to end: validate, replay-check,
    /// admit via the counter, create the pending record and emit the
    /// finalize message, or fall back to the waitlist.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown event, `Validation` for an expired
    /// event or a bad seat list, `Conflict` when a requested seat is
    /// already taken, `Transient` on infrastructure failure.
    pub async fn create_booking(
        &self,
        event_id: EventId,
        user: UserId,
        idempotency_key: Option<String>,
        seats: Vec<String>,
    ) -> Result<BookingOutcome> {
        let event = self
            .providers
            .events
            .get(event_id)
            .await?
            .ok_or(CoreError::NotFound("event"))?;

        let now = Utc::now();
        if event.has_ended(now) {
            if let Err(e) = self
                .providers
                .events
                .update_status(event_id, EventStatus::Expired)
                .await
            {
                tracing::error!(event_id = %event_id, error = %e, "failed to mark event expired");
            }
            BookingMetrics::record_outcome("rejected");
            return Err(CoreError::Validation("event is expired".to_string()));
        }
        if seats.is_empty() {
            return Err(CoreError::Validation("no seats requested".to_string()));
        }
        if seats.len() > usize::try_from(event.max_tickets_per_booking.max(0)).unwrap_or(0) {
            return Err(CoreError::Validation(format!(
                "cannot book more than {} tickets",
                event.max_tickets_per_booking
            )));
        }

        if let Some(key) = idempotency_key.as_deref() {
            if let Some(existing) = self
                .providers
                .ledger
                .get_by_idempotency(event_id, key)
                .await?
            {
                return Ok(BookingOutcome::Replayed(existing));
            }
        }

        let n = seats.len() as i64;
        if !self.providers.counter.reserve(event_id, n).await? {
            // Refused is not an error: queue the user fairly instead.
            let position = self.providers.waitlist.add(event_id, user).await?;
            BookingMetrics::record_outcome("waitlisted");
            return Ok(BookingOutcome::Waitlisted { position });
        }

        let hold_until = now + chrono::Duration::from_std(self.grace).unwrap_or_else(|_| chrono::Duration::zero());
        let booking = match self
            .providers
            .ledger
            .create_pending(user, event_id, idempotency_key.as_deref(), &seats, hold_until)
            .await
        {
            Ok(booking) => booking,
            Err(e) => {
                // The admission already decremented the counter; hand
                // the tokens back before surfacing the failure. (A
                // crash between the two steps is repaired by the
                // reconciler.)
                if let Err(release_err) = self.providers.counter.release(event_id, n).await {
                    tracing::error!(
                        event_id = %event_id,
                        error = %release_err,
                        "failed to release admission tokens after insert failure"
                    );
                }
                BookingMetrics::record_outcome("rejected");
                return Err(e);
            }
        };

        let message = FinalizeMessage::finalize(
            booking.id,
            event_id,
            user,
            seats,
            booking.idempotency_key.clone(),
        );
        if let Err(e) = self.providers.publisher.publish(&message).await {
            // Deliberately swallowed: the pending record is durable and
            // the reconciler plus the timeout path bound the damage of
            // a lost message.
            tracing::error!(booking_id = %booking.id, error = %e, "finalize publish failed");
        }

        BookingMetrics::record_outcome("pending");
        Ok(BookingOutcome::Pending(booking))
    }

    /// Cancel a booking. For a previously booked booking this releases
    /// admission tokens, emails the user a refund link and promotes
    /// the next waitlist entry onto the freed seats.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown booking, `Conflict` for a booking in
    /// a non-cancellable state, `Transient` on infrastructure failure.
    pub async fn cancel(&self, booking_id: BookingId) -> Result<Booking> {
        let (booking, was_booked) = self.providers.ledger.cancel(booking_id).await?;

        if !was_booked {
            return Ok(booking);
        }

        let n = booking.seat_count() as i64;
        if let Err(e) = self.providers.counter.release(booking.event_id, n).await {
            tracing::error!(event_id = %booking.event_id, error = %e, "token release failed");
        }

        let event = self
            .providers
            .events
            .get(booking.event_id)
            .await?
            .ok_or(CoreError::NotFound("event"))?;

        match self.providers.users.email_for(booking.user_id).await {
            Ok(email) => {
                let refund_link = format!(
                    "{}/v1/payment/refund?booking_id={}",
                    self.payment_url, booking_id
                );
                if let Err(e) = self
                    .providers
                    .notifier
                    .send_cancellation(&email, event.cancellation_fee, &refund_link)
                    .await
                {
                    tracing::error!(booking_id = %booking_id, error = %e, "cancellation email failed");
                }
            }
            Err(e) => {
                tracing::error!(user_id = %booking.user_id, error = %e, "cancelling user has no email");
            }
        }

        let hold_until = Utc::now() + chrono::Duration::from_std(self.grace).unwrap_or_else(|_| chrono::Duration::zero());
        promote_next(&self.providers, &event, &booking.seats, hold_until).await?;

        Ok(booking)
    }

    /// Current lifecycle status of a booking.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown booking, `Transient` on database
    /// failure.
    pub async fn booking_status(&self, booking_id: BookingId) -> Result<BookingStatus> {
        self.providers
            .ledger
            .status(booking_id)
            .await?
            .ok_or(CoreError::NotFound("booking"))
    }

    /// A user's bookings, newest first.
    ///
    /// # Errors
    ///
    /// `Transient` on database failure.
    pub async fn list_user_bookings(
        &self,
        user: UserId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Booking>> {
        self.providers.ledger.list_by_user(user, limit, offset).await
    }
}
