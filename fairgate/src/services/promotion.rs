//! Waitlist promotion, shared by the cancellation and timeout paths.

use crate::environment::Providers;
use crate::providers::{
    BookingLedger, EventCatalog, FinalizePublisher, InventoryCounter, Notifier, TimeoutStore,
    UserDirectory, WaitlistStore,
};
use chrono::{DateTime, Utc};
use fairgate_core::{Booking, Event, FinalizeMessage, Result};

/// Promote the next active waitlist entry onto the freed seats.
///
/// Creates a new pending booking for the promoted user, emits a
/// finalize message for it (the worker sends the payment request and
/// schedules the timeout when it consumes the message), notifies the
/// *promoted* user, and consumes the waitlist entry.
///
/// Returns `None` when the waitlist is empty. Notification and
/// queue-maintenance failures are logged, not propagated: the pending
/// booking exists either way and the timeout path bounds the damage.
pub(crate) async fn promote_next<L, E, W, C, T, P, N, U>(
    providers: &Providers<L, E, W, C, T, P, N, U>,
    event: &Event,
    seats: &[String],
    hold_until: DateTime<Utc>,
) -> Result<Option<Booking>>
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
    let Some(entry) = providers.waitlist.next_active(event.id).await? else {
        tracing::info!(event_id = %event.id, "no waitlist entries to promote");
        return Ok(None);
    };

    let booking = providers
        .ledger
        .create_pending(entry.user_id, event.id, None, seats, hold_until)
        .await?;

    let message = FinalizeMessage::finalize(
        booking.id,
        event.id,
        entry.user_id,
        seats.to_vec(),
        None,
    );
    if let Err(e) = providers.publisher.publish(&message).await {
        tracing::error!(booking_id = %booking.id, error = %e, "promotion publish failed");
    }

    match providers.users.email_for(entry.user_id).await {
        Ok(email) => {
            if let Err(e) = providers
                .notifier
                .send_waitlist_promotion(&email, &event.name)
                .await
            {
                tracing::error!(user_id = %entry.user_id, error = %e, "promotion email failed");
            }
        }
        Err(e) => {
            tracing::error!(user_id = %entry.user_id, error = %e, "promoted user has no email");
        }
    }

    if let Err(e) = providers.waitlist.remove(entry.id).await {
        tracing::error!(entry_id = %entry.id, error = %e, "failed to consume waitlist entry");
    }

    tracing::info!(
        event_id = %event.id,
        new_booking_id = %booking.id,
        user_id = %entry.user_id,
        position = entry.position,
        "waitlist user promoted"
    );
    Ok(Some(booking))
}
