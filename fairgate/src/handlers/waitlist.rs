//! Waitlist endpoints.

use crate::handlers::bookings::PageQuery;
use crate::providers::WaitlistStore;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use fairgate_core::{EventId, WaitlistEntry};
use fairgate_web::{AppError, AuthUser};
use serde::Serialize;

fn parse_event(raw: &str) -> Result<EventId, AppError> {
    EventId::parse(raw).map_err(|_| AppError::bad_request("malformed event id"))
}

/// Response of `POST /v1/waitlist/{event}/join`.
#[derive(Debug, Serialize)]
pub struct JoinResponse {
    position: i32,
}

/// `POST /v1/waitlist/{event}/join`
pub async fn join(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<String>,
) -> Result<Json<JoinResponse>, AppError> {
    let event_id = parse_event(&event_id)?;
    let position = state.waitlist.add(event_id, user.user_id).await?;
    Ok(Json(JoinResponse { position }))
}

/// Response of `POST /v1/waitlist/{event}/optout`.
#[derive(Debug, Serialize)]
pub struct OptOutResponse {
    opted_out: bool,
}

/// `POST /v1/waitlist/{event}/optout`
pub async fn opt_out(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<String>,
) -> Result<Json<OptOutResponse>, AppError> {
    let event_id = parse_event(&event_id)?;
    state.waitlist.opt_out(event_id, user.user_id).await?;
    Ok(Json(OptOutResponse { opted_out: true }))
}

/// Response of `GET /v1/waitlist/{event}/count`.
#[derive(Debug, Serialize)]
pub struct CountResponse {
    count: i64,
}

/// `GET /v1/waitlist/{event}/count`
pub async fn count(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<CountResponse>, AppError> {
    let event_id = parse_event(&event_id)?;
    let count = state.waitlist.count(event_id).await?;
    Ok(Json(CountResponse { count }))
}

/// Response of `GET /v1/waitlist/{event}`.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    waitlist: Vec<WaitlistEntry>,
    limit: i64,
    offset: i64,
}

/// `GET /v1/waitlist/{event}`
pub async fn list(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ListResponse>, AppError> {
    let event_id = parse_event(&event_id)?;
    let entries = state
        .waitlist
        .list_by_event(event_id, page.limit, page.offset)
        .await?;
    Ok(Json(ListResponse {
        waitlist: entries,
        limit: page.limit,
        offset: page.offset,
    }))
}
