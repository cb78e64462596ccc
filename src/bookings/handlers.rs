use axum::{
    extract::State,
    routing::{delete, get, post},
    Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{dto::CreateBookingRequest, repo::Booking};
use crate::{
    auth::extractors::VerifiedEmail,
    error::AppResult,
    extract::{Json, Path},
    state::AppState,
    store::{DeleteResult, InsertOneResult},
};

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/booking", post(create_booking))
        .route("/bookings", get(my_bookings))
        .route("/booking/:id", get(get_booking))
        .route("/myorders/:id", delete(delete_booking))
        .route("/mybuyers/:email", get(my_buyers))
}

#[instrument(skip(state, payload))]
pub async fn create_booking(
    State(state): State<AppState>,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<Json<InsertOneResult>> {
    let booking = payload.validate()?;
    let res = Booking::create(state.store.as_ref(), &booking).await?;
    info!(buyer = %booking.buyer_email, product = %booking.product_id, id = %res.inserted_id, "booking created");
    Ok(Json(res))
}

/// The caller's orders (`GET /bookings?email=`).
#[instrument(skip(state))]
pub async fn my_bookings(
    State(state): State<AppState>,
    VerifiedEmail(email): VerifiedEmail,
) -> AppResult<Json<Vec<Booking>>> {
    Ok(Json(Booking::list_by_buyer(state.store.as_ref(), &email).await?))
}

#[instrument(skip(state))]
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Option<Booking>>> {
    Ok(Json(Booking::find_by_id(state.store.as_ref(), id).await?))
}

#[instrument(skip(state))]
pub async fn delete_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DeleteResult>> {
    Ok(Json(Booking::delete(state.store.as_ref(), id).await?))
}

/// Bookings placed on a seller's products (`GET /mybuyers/:email`).
#[instrument(skip(state))]
pub async fn my_buyers(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<Vec<Booking>>> {
    let email = email.trim().to_lowercase();
    Ok(Json(Booking::list_by_seller(state.store.as_ref(), &email).await?))
}
