//! Payment callback endpoints.
//!
//! The external gateway calls back with GET requests carrying query
//! parameters, mirroring the links embedded in notification emails.

use crate::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use fairgate_core::BookingId;
use fairgate_web::AppError;
use serde::{Deserialize, Serialize};

/// Query of `GET /v1/payment/booking`.
#[derive(Debug, Deserialize)]
pub struct PaymentQuery {
    /// Booking being paid for.
    pub booking_id: String,
    /// Amount paid.
    pub amount: f64,
    /// Gateway-side payment reference.
    #[serde(default)]
    pub payment_id: String,
}

/// Callback response body.
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    booking_id: Option<BookingId>,
}

/// `GET /v1/payment/booking?booking_id=…&amount=…&payment_id=…`
pub async fn booking_payment(
    State(state): State<AppState>,
    Query(query): Query<PaymentQuery>,
) -> Result<Json<PaymentResponse>, AppError> {
    let booking_id = BookingId::parse(&query.booking_id)
        .map_err(|_| AppError::bad_request("malformed booking id"))?;

    let booking = state
        .payment
        .process_payment(booking_id, query.amount, &query.payment_id)
        .await?;

    Ok(Json(PaymentResponse {
        success: true,
        message: "payment processed".to_string(),
        booking_id: Some(booking.id),
    }))
}

/// Query of `GET /v1/payment/refund`.
#[derive(Debug, Deserialize)]
pub struct RefundQuery {
    /// Booking being refunded.
    pub booking_id: String,
}

/// `GET /v1/payment/refund?booking_id=…`
pub async fn refund(
    State(state): State<AppState>,
    Query(query): Query<RefundQuery>,
) -> Result<Json<PaymentResponse>, AppError> {
    let booking_id = BookingId::parse(&query.booking_id)
        .map_err(|_| AppError::bad_request("malformed booking id"))?;

    let refunded = state.payment.process_refund(booking_id).await?;

    Ok(Json(PaymentResponse {
        success: true,
        message: format!("refund processed, amount {refunded:.2}"),
        booking_id: Some(booking_id),
    }))
}
