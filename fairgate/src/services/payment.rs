//! Payment and refund callbacks.
//!
//! Payment capture itself is an external concern; these callbacks are
//! the opaque notification that money moved. Payment promotes a
//! pending booking to booked; refund settles a cancelled one minus the
//! event's cancellation fee.

use crate::environment::Providers;
use crate::providers::{
    BookingLedger, EventCatalog, FinalizePublisher, InventoryCounter, Notifier, TimeoutStore,
    UserDirectory, WaitlistStore,
};
use fairgate_core::{Booking, BookingId, BookingStatus, CoreError, PaymentStatus, Result};
use std::sync::Arc;

/// The payment callback service.
pub struct PaymentService<L, E, W, C, T, P, N, U>
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
}

impl<L, E, W, C, T, P, N, U> PaymentService<L, E, W, C, T, P, N, U>
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
    /// Create a payment service.
    #[must_use]
    pub fn new(providers: Arc<Providers<L, E, W, C, T, P, N, U>>) -> Self {
        Self { providers }
    }

    /// Payment callback: validate the amount, finalize the booking
    /// (`pending → booked`, seats booked, reserved counter bumped) and
    /// flag the timeout record as processed so the armed watchdog
    /// stands down.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown booking, `Conflict` when the booking
    /// is not pending (already paid, cancelled or timed out),
    /// `Validation` when the amount is below the expected total.
    pub async fn process_payment(
        &self,
        booking_id: BookingId,
        amount: f64,
        payment_id: &str,
    ) -> Result<Booking> {
        let booking = self
            .providers
            .ledger
            .get(booking_id)
            .await?
            .ok_or(CoreError::NotFound("booking"))?;

        match booking.status {
            BookingStatus::Pending => {}
            BookingStatus::Booked => {
                return Err(CoreError::Conflict("booking already paid".to_string()));
            }
            other => {
                return Err(CoreError::Conflict(format!(
                    "booking is in {} status",
                    other.as_str()
                )));
            }
        }

        let event = self
            .providers
            .events
            .get(booking.event_id)
            .await?
            .ok_or(CoreError::NotFound("event"))?;

        #[allow(clippy::cast_precision_loss)]
        let expected = event.ticket_price * booking.seat_count() as f64;
        if amount < expected {
            return Err(CoreError::Validation(format!(
                "amount {amount:.2} below expected {expected:.2}"
            )));
        }

        tracing::info!(booking_id = %booking_id, payment_id, amount, "processing payment");

        self.providers
            .ledger
            .finalize(booking_id, &booking.seats, amount)
            .await?;

        // Tell the armed watchdog that payment landed. Best-effort:
        // the timeout path re-checks the (now booked) status anyway.
        if let Err(e) = self
            .providers
            .timeouts
            .mark_processed(booking.event_id, booking_id)
            .await
        {
            tracing::error!(booking_id = %booking_id, error = %e, "failed to mark timeout processed");
        }

        self.providers
            .ledger
            .get(booking_id)
            .await?
            .ok_or(CoreError::NotFound("booking"))
    }

    /// Refund callback: settle a paid booking minus the event's
    /// cancellation fee (floored at zero). Returns the refunded
    /// amount.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown booking or event, `Conflict` when the
    /// booking was never paid.
    pub async fn process_refund(&self, booking_id: BookingId) -> Result<f64> {
        let booking = self
            .providers
            .ledger
            .get(booking_id)
            .await?
            .ok_or(CoreError::NotFound("booking"))?;

        if booking.payment_status != PaymentStatus::Paid {
            return Err(CoreError::Conflict("booking was not paid".to_string()));
        }

        let event = self
            .providers
            .events
            .get(booking.event_id)
            .await?
            .ok_or(CoreError::NotFound("event"))?;

        let refund = (booking.amount_paid - event.cancellation_fee).max(0.0);

        tracing::info!(
            booking_id = %booking_id,
            refund,
            cancellation_fee = event.cancellation_fee,
            "processing refund"
        );

        self.providers
            .ledger
            .update_payment_status(booking_id, PaymentStatus::Refunded, refund)
            .await?;

        Ok(refund)
    }
}
