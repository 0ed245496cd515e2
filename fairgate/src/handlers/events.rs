//! Event endpoints relevant to the booking core.

use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use fairgate_core::EventId;
use fairgate_web::AppError;
use serde::Serialize;

/// Response of `GET /v1/events/{event}/seats`.
#[derive(Debug, Serialize)]
pub struct AvailableSeatsResponse {
    seats: Vec<String>,
}

/// `GET /v1/events/{event}/seats`: currently available seat labels.
pub async fn available_seats(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<AvailableSeatsResponse>, AppError> {
    let event_id =
        EventId::parse(&event_id).map_err(|_| AppError::bad_request("malformed event id"))?;
    let seats = state.seats.available_seats(event_id).await?;
    Ok(Json(AvailableSeatsResponse { seats }))
}
