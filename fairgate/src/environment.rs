//! Provider bundle for dependency injection.

use crate::providers::{
    BookingLedger, EventCatalog, FinalizePublisher, InventoryCounter, Notifier, TimeoutStore,
    UserDirectory, WaitlistStore,
};

/// All external dependencies the booking services need, bundled so the
/// coordinator, worker and reconciler share one wiring point.
///
/// # Type Parameters
///
/// - `L`: booking ledger (Postgres in production)
/// - `E`: event catalog (Postgres)
/// - `W`: waitlist store (Postgres)
/// - `C`: inventory counter (Redis)
/// - `T`: timeout registry (Redis)
/// - `P`: finalize stream publisher (Kafka)
/// - `N`: notifier (SMTP)
/// - `U`: user directory (Postgres)
pub struct Providers<L, E, W, C, T, P, N, U>
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
    /// Booking ledger (C2).
    pub ledger: L,

    /// Event catalog.
    pub events: E,

    /// Waitlist (C4).
    pub waitlist: W,

    /// Inventory counter (C1).
    pub counter: C,

    /// Timeout registry (C7).
    pub timeouts: T,

    /// Finalize stream publisher.
    pub publisher: P,

    /// Outbound notifications.
    pub notifier: N,

    /// User id → email lookups.
    pub users: U,
}

impl<L, E, W, C, T, P, N, U> Providers<L, E, W, C, T, P, N, U>
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
    /// Bundle the providers.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        ledger: L,
        events: E,
        waitlist: W,
        counter: C,
        timeouts: T,
        publisher: P,
        notifier: N,
        users: U,
    ) -> Self {
        Self {
            ledger,
            events,
            waitlist,
            counter,
            timeouts,
            publisher,
            notifier,
            users,
        }
    }
}
