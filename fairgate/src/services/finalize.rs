//! Finalize pipeline (C6): confirms or times out pending bookings.
//!
//! One instance is shared by the whole worker pool. `dispatch` handles
//! a decoded stream message; `schedule_timeout` arms the grace-window
//! watchdog for a pending booking as a spawned cooperative task that a
//! shutdown signal can cancel.

use crate::environment::Providers;
use crate::providers::{
    BookingLedger, EventCatalog, FinalizePublisher, InventoryCounter, Notifier, TimeoutState,
    TimeoutStore, UserDirectory, WaitlistStore,
};
use crate::services::promotion::promote_next;
use chrono::Utc;
use fairgate_core::{CoreError, FinalizeMessage, MessageKind, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// The finalize service.
pub struct FinalizeService<L, E, W, C, T, P, N, U>
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
    shutdown: watch::Receiver<bool>,
}

// Hand-rolled so the provider types themselves need not be Clone; the
// bundle is behind an Arc.
impl<L, E, W, C, T, P, N, U> Clone for FinalizeService<L, E, W, C, T, P, N, U>
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
    fn clone(&self) -> Self {
        Self {
            providers: Arc::clone(&self.providers),
            payment_url: self.payment_url.clone(),
            grace: self.grace,
            shutdown: self.shutdown.clone(),
        }
    }
}

impl<L, E, W, C, T, P, N, U> FinalizeService<L, E, W, C, T, P, N, U>
where
    L: BookingLedger + 'static,
    E: EventCatalog + 'static,
    W: WaitlistStore + 'static,
    C: InventoryCounter + 'static,
    T: TimeoutStore + 'static,
    P: FinalizePublisher + 'static,
    N: Notifier + 'static,
    U: UserDirectory + 'static,
{
    /// Create a finalize service.
    ///
    /// `shutdown` flips to `true` when the process is draining; armed
    /// timeout tasks then stand down instead of firing.
    #[must_use]
    pub fn new(
        providers: Arc<Providers<L, E, W, C, T, P, N, U>>,
        payment_url: String,
        grace: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            providers,
            payment_url,
            grace,
            shutdown,
        }
    }

    /// Handle one decoded stream message.
    ///
    /// # Errors
    ///
    /// `Transient` errors mean "do not acknowledge, let the message
    /// redeliver"; everything else is terminal and the caller
    /// dead-letters the message.
    pub async fn dispatch(&self, message: FinalizeMessage) -> Result<()> {
        match message.kind {
            MessageKind::FinalizeBooking => self.handle_finalize(message).await,
            MessageKind::BookingTimeout => self.handle_timeout(&message).await,
        }
    }

    /// `finalize_booking`: send the payment request and arm the
    /// timeout.
    async fn handle_finalize(&self, message: FinalizeMessage) -> Result<()> {
        let Some(booking) = self.providers.ledger.get(message.booking_id).await? else {
            tracing::warn!(booking_id = %message.booking_id, "finalize for unknown booking, acking");
            return Ok(());
        };
        if !booking.is_pending() {
            tracing::info!(
                booking_id = %booking.id,
                status = booking.status.as_str(),
                "booking no longer pending, nothing to finalize"
            );
            return Ok(());
        }

        let event = self
            .providers
            .events
            .get(message.event_id)
            .await?
            .ok_or_else(|| {
                CoreError::Fatal(format!("event {} missing for finalize", message.event_id))
            })?;

        #[allow(clippy::cast_precision_loss)]
        let amount = event.ticket_price * message.seats.len() as f64;
        let payment_link = format!(
            "{}/v1/payment/booking?booking_id={}&amount={:.2}&payment_id={}",
            self.payment_url, message.booking_id, amount, message.booking_id
        );

        let email = match self.providers.users.email_for(message.user_id).await {
            Ok(email) => email,
            Err(CoreError::NotFound(_)) => {
                return Err(CoreError::Fatal(format!(
                    "user {} missing for finalize",
                    message.user_id
                )));
            }
            Err(e) => return Err(e),
        };

        self.providers
            .notifier
            .send_payment_request(&email, &event.name, amount, &payment_link)
            .await?;

        self.schedule_timeout(message);
        Ok(())
    }

    /// Arm the grace-window watchdog for a pending booking.
    ///
    /// Writes the timeout record, then sleeps the grace period off the
    /// consumer's critical path. When the window closes and the record
    /// was not marked `processed` by the payment callback, the timeout
    /// path runs; either way the record is deleted afterwards.
    pub fn schedule_timeout(&self, message: FinalizeMessage) {
        let service = self.clone();
        let mut shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let (event, booking) = (message.event_id, message.booking_id);
            if let Err(e) = service.providers.timeouts.begin(event, booking).await {
                tracing::error!(booking_id = %booking, error = %e, "failed to arm timeout record");
            }

            tokio::select! {
                () = tokio::time::sleep(service.grace) => {}
                _ = shutdown.wait_for(|draining| *draining) => {
                    // Shutting down: leave the record in place. The
                    // booking stays pending and is picked up after the
                    // finalize message redelivers.
                    tracing::info!(booking_id = %booking, "timeout task cancelled by shutdown");
                    return;
                }
            }

            let state = match service.providers.timeouts.get(event, booking).await {
                Ok(state) => state,
                Err(e) => {
                    tracing::error!(booking_id = %booking, error = %e, "timeout record read failed");
                    TimeoutState::Processing
                }
            };

            if state != TimeoutState::Processed {
                let timeout = FinalizeMessage::timeout(
                    booking,
                    event,
                    message.user_id,
                    message.seats.clone(),
                );
                if let Err(e) = service.handle_timeout(&timeout).await {
                    tracing::error!(booking_id = %booking, error = %e, "booking timeout failed");
                }
            }

            if let Err(e) = service.providers.timeouts.delete(event, booking).await {
                tracing::error!(booking_id = %booking, error = %e, "timeout record delete failed");
            }
        });
    }

    /// `booking_timeout`: cancel an unpaid pending booking, restore the
    /// counter and promote the waitlist onto the freed seats.
    async fn handle_timeout(&self, message: &FinalizeMessage) -> Result<()> {
        let Some(booking) = self.providers.ledger.get(message.booking_id).await? else {
            tracing::warn!(booking_id = %message.booking_id, "timeout for unknown booking, acking");
            return Ok(());
        };
        if !booking.is_pending() {
            // Payment arrived (or a cancel raced us); nothing to do.
            tracing::info!(
                booking_id = %booking.id,
                status = booking.status.as_str(),
                "booking resolved before timeout"
            );
            return Ok(());
        }

        let (cancelled, _was_booked) = self.providers.ledger.cancel(message.booking_id).await?;

        // Hand the admission tokens back so the freed seats are
        // bookable again; counter drift on failure is repaired by the
        // reconciler.
        let n = cancelled.seat_count() as i64;
        if let Err(e) = self.providers.counter.release(message.event_id, n).await {
            tracing::error!(event_id = %message.event_id, error = %e, "token restore failed");
        }

        let event = self
            .providers
            .events
            .get(message.event_id)
            .await?
            .ok_or_else(|| {
                CoreError::Fatal(format!("event {} missing for timeout", message.event_id))
            })?;

        let hold_until =
            Utc::now() + chrono::Duration::from_std(self.grace).unwrap_or_else(|_| chrono::Duration::zero());
        promote_next(&self.providers, &event, &cancelled.seats, hold_until).await?;

        tracing::info!(
            booking_id = %cancelled.id,
            event_id = %event.id,
            "unpaid booking timed out and cancelled"
        );
        Ok(())
    }
}
