//! Booking endpoints.

use crate::services::BookingOutcome;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use fairgate_core::{Booking, BookingId, EventId};
use fairgate_web::{AppError, AuthUser};
use serde::{Deserialize, Serialize};

/// Body of `POST /v1/bookings/{event}/book`.
#[derive(Debug, Deserialize)]
pub struct BookRequest {
    /// Requested seat labels.
    pub seats: Vec<String>,
}

/// Booking response: a created/replayed booking or a waitlist slot.
#[derive(Debug, Serialize)]
pub struct BookResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    booking_id: Option<BookingId>,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<i32>,
}

/// `POST /v1/bookings/{event}/book`
///
/// `202 {booking_id, status: "pending"}` when admitted,
/// `200 {status: "waitlisted", position}` when the event is full.
/// An optional `Idempotency-Key` header makes retries replay-safe.
pub async fn book(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<BookRequest>,
) -> Result<(StatusCode, Json<BookResponse>), AppError> {
    let event_id = EventId::parse(&event_id)
        .map_err(|_| AppError::bad_request("malformed event id"))?;
    let idempotency_key = headers
        .get("Idempotency-Key")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let outcome = state
        .coordinator
        .create_booking(event_id, user.user_id, idempotency_key, body.seats)
        .await?;

    Ok(match outcome {
        BookingOutcome::Pending(booking) => (
            StatusCode::ACCEPTED,
            Json(BookResponse {
                booking_id: Some(booking.id),
                status: "pending",
                position: None,
            }),
        ),
        BookingOutcome::Replayed(booking) => (
            StatusCode::OK,
            Json(BookResponse {
                booking_id: Some(booking.id),
                status: booking.status.as_str(),
                position: None,
            }),
        ),
        BookingOutcome::Waitlisted { position } => (
            StatusCode::OK,
            Json(BookResponse {
                booking_id: None,
                status: "waitlisted",
                position: Some(position),
            }),
        ),
    })
}

/// Response of `POST /v1/bookings/{booking}/cancel`.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    booking_id: BookingId,
    status: &'static str,
}

/// `POST /v1/bookings/{booking}/cancel`
pub async fn cancel(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(booking_id): Path<String>,
) -> Result<Json<CancelResponse>, AppError> {
    let booking_id = BookingId::parse(&booking_id)
        .map_err(|_| AppError::bad_request("malformed booking id"))?;
    let booking = state.coordinator.cancel(booking_id).await?;
    Ok(Json(CancelResponse {
        booking_id: booking.id,
        status: "cancelled",
    }))
}

/// Response of `GET /v1/bookings/{booking}/status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: &'static str,
}

/// `GET /v1/bookings/{booking}/status`
pub async fn status(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(booking_id): Path<String>,
) -> Result<Json<StatusResponse>, AppError> {
    let booking_id = BookingId::parse(&booking_id)
        .map_err(|_| AppError::bad_request("malformed booking id"))?;
    let status = state.coordinator.booking_status(booking_id).await?;
    Ok(Json(StatusResponse {
        status: status.as_str(),
    }))
}

/// Paging query for booking listings.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    /// Page size (default 50).
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Page offset (default 0).
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Response of `GET /v1/bookings/user-bookings`.
#[derive(Debug, Serialize)]
pub struct UserBookingsResponse {
    bookings: Vec<Booking>,
    limit: i64,
    offset: i64,
}

/// `GET /v1/bookings/user-bookings`
pub async fn user_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<UserBookingsResponse>, AppError> {
    let bookings = state
        .coordinator
        .list_user_bookings(user.user_id, page.limit, page.offset)
        .await?;
    Ok(Json(UserBookingsResponse {
        bookings,
        limit: page.limit,
        offset: page.offset,
    }))
}
