use axum::{extract::State, routing::post, Router};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use super::provider::{to_minor_units, PaymentProvider, CURRENCY};
use crate::{
    bookings::repo::Booking,
    error::{AppError, AppResult},
    extract::Json,
    state::AppState,
    store::UpdateResult,
    validate::require_non_empty,
};

/// The booking being paid for; only `price` (major units) is used.
#[derive(Debug, Deserialize)]
pub struct PaymentIntentRequest {
    pub price: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfoRequest {
    pub booking_id: Uuid,
    pub transaction_id: String,
}

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/create-payment-intent", post(create_payment_intent))
        .route("/paymentinfo", post(record_payment))
}

#[instrument(skip(state, payload))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    Json(payload): Json<PaymentIntentRequest>,
) -> AppResult<Json<Value>> {
    if !payload.price.is_finite() || payload.price <= 0.0 {
        return Err(AppError::Validation("price must be a positive number".into()));
    }
    let amount = to_minor_units(payload.price);
    let intent = state
        .payments
        .create_payment_intent(amount, CURRENCY)
        .await
        .map_err(AppError::Payment)?;
    info!(amount, currency = CURRENCY, "payment intent created");
    Ok(Json(intent))
}

/// Marks the booking paid (`POST /paymentinfo`).
#[instrument(skip(state, payload))]
pub async fn record_payment(
    State(state): State<AppState>,
    Json(payload): Json<PaymentInfoRequest>,
) -> AppResult<Json<UpdateResult>> {
    let transaction_id = require_non_empty("transactionId", &payload.transaction_id)?;
    let res = Booking::record_payment(state.store.as_ref(), payload.booking_id, &transaction_id).await?;
    if res.matched_count == 0 {
        return Err(AppError::NotFound("booking"));
    }
    info!(booking = %payload.booking_id, %transaction_id, "payment recorded");
    Ok(Json(res))
}
