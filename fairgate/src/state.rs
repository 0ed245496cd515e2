//! Application state shared across HTTP handlers.

use crate::environment::Providers;
use crate::providers::MailNotifier;
use crate::services::{BookingCoordinator, PaymentService};
use crate::stores::{
    PgBookingLedger, PgEventCatalog, PgSeatRegistry, PgUserDirectory, PgWaitlistStore,
    RedisInventoryCounter, RedisTimeoutStore,
};
use fairgate_stream::BookingProducer;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Production provider assembly.
pub type AppProviders = Providers<
    PgBookingLedger,
    PgEventCatalog,
    PgWaitlistStore,
    RedisInventoryCounter,
    RedisTimeoutStore,
    BookingProducer,
    MailNotifier,
    PgUserDirectory,
>;

/// Coordinator over the production providers.
pub type AppCoordinator = BookingCoordinator<
    PgBookingLedger,
    PgEventCatalog,
    PgWaitlistStore,
    RedisInventoryCounter,
    RedisTimeoutStore,
    BookingProducer,
    MailNotifier,
    PgUserDirectory,
>;

/// Payment service over the production providers.
pub type AppPaymentService = PaymentService<
    PgBookingLedger,
    PgEventCatalog,
    PgWaitlistStore,
    RedisInventoryCounter,
    RedisTimeoutStore,
    BookingProducer,
    MailNotifier,
    PgUserDirectory,
>;

/// Shared state for the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    /// Booking coordinator (C5).
    pub coordinator: Arc<AppCoordinator>,

    /// Payment/refund callbacks.
    pub payment: Arc<AppPaymentService>,

    /// Waitlist store, used directly by the waitlist endpoints.
    pub waitlist: PgWaitlistStore,

    /// Seat registry, used by the available-seats endpoint.
    pub seats: PgSeatRegistry,

    /// Prometheus render handle; `None` when a recorder was already
    /// installed elsewhere in the process.
    pub metrics: Option<PrometheusHandle>,
}
