//! Router composition.

use crate::handlers::{bookings, events, health, payment, waitlist};
use crate::state::AppState;
use axum::routing::{get, post};
use axum::{Extension, Router};
use fairgate_web::{correlation_id_layer, JwtDecoder};
use tower_http::trace::TraceLayer;

/// Compose the full HTTP surface.
///
/// # Routes
///
/// ## Bookings (JWT auth)
/// - `POST /v1/bookings/:event_id/book`
/// - `POST /v1/bookings/:booking_id/cancel`
/// - `GET  /v1/bookings/:booking_id/status`
/// - `GET  /v1/bookings/user-bookings`
///
/// ## Payment callbacks
/// - `GET /v1/payment/booking`
/// - `GET /v1/payment/refund`
///
/// ## Waitlist
/// - `POST /v1/waitlist/:event_id/join` (JWT auth)
/// - `POST /v1/waitlist/:event_id/optout` (JWT auth)
/// - `GET  /v1/waitlist/:event_id/count`
/// - `GET  /v1/waitlist/:event_id`
///
/// ## Events
/// - `GET /v1/events/:event_id/seats`
///
/// ## Operational
/// - `GET /health`, `GET /metrics`
pub fn build_router(state: AppState, jwt: JwtDecoder) -> Router {
    Router::new()
        .route("/v1/bookings/:id/book", post(bookings::book))
        .route("/v1/bookings/:id/cancel", post(bookings::cancel))
        .route("/v1/bookings/:id/status", get(bookings::status))
        .route("/v1/bookings/user-bookings", get(bookings::user_bookings))
        .route("/v1/payment/booking", get(payment::booking_payment))
        .route("/v1/payment/refund", get(payment::refund))
        .route("/v1/waitlist/:event_id/join", post(waitlist::join))
        .route("/v1/waitlist/:event_id/optout", post(waitlist::opt_out))
        .route("/v1/waitlist/:event_id/count", get(waitlist::count))
        .route("/v1/waitlist/:event_id", get(waitlist::list))
        .route("/v1/events/:event_id/seats", get(events::available_seats))
        .route("/health", get(health::health))
        .route("/metrics", get(health::metrics))
        .layer(Extension(jwt))
        .layer(correlation_id_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
