//! Booking services: the synchronous coordinator, the asynchronous
//! finalize pipeline, the payment callbacks and the reconciler.

pub mod bookings;
pub mod finalize;
pub mod payment;
mod promotion;
pub mod reconcile;

pub use bookings::{BookingCoordinator, BookingOutcome};
pub use finalize::FinalizeService;
pub use payment::PaymentService;
pub use reconcile::{ReconcileSummary, Reconciler};
