use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post, put},
    Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{
        AdminStatus, BuyerStatus, CreateUserRequest, EmailQuery, GoogleUserRequest, SellerStatus,
        UserTypeQuery,
    },
    repo::User,
};
use crate::{
    auth::{extractors::VerifiedEmail, roles},
    error::{AppError, AppResult},
    extract::{Json, Path, Query},
    state::AppState,
    store::{DeleteResult, InsertOneResult, UpdateResult},
    validate::normalize_email,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route("/user", get(get_user))
        .route("/user/:id", put(verify_seller).delete(delete_user))
        .route("/googleuser/:email", put(sync_google_user))
}

pub fn role_routes() -> Router<AppState> {
    Router::new()
        .route("/users/admin/:email", get(admin_status))
        .route("/users/buyer/:email", get(buyer_status))
        .route("/users/seller/:email", get(seller_status))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<Json<InsertOneResult>> {
    let user = payload.validate()?;

    if User::find_by_email(state.store.as_ref(), &user.email).await?.is_some() {
        warn!(email = %user.email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    // a concurrent signup can still win the unique index
    let res = User::create(state.store.as_ref(), &user)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("Email already registered".into()),
            other => other,
        })?;
    info!(email = %user.email, user_type = ?user.user_type, id = %res.inserted_id, "user created");
    Ok(Json(res))
}

/// GET /users?userType=&email= (admin only)
#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    VerifiedEmail(acting): VerifiedEmail,
    Query(q): Query<UserTypeQuery>,
) -> AppResult<Json<Vec<User>>> {
    roles::require_admin(state.store.as_ref(), &acting).await?;
    let users = User::list(state.store.as_ref(), q.user_type).await?;
    Ok(Json(users))
}

/// `GET /user?email=` returns `null` when nobody has that email.
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Query(q): Query<EmailQuery>,
) -> AppResult<Json<Option<User>>> {
    let email = q.email.trim().to_lowercase();
    let user = User::find_by_email(state.store.as_ref(), &email).await?;
    Ok(Json(user))
}

/// Admin marks a seller as verified (`PUT /user/:id?email=`).
#[instrument(skip(state))]
pub async fn verify_seller(
    State(state): State<AppState>,
    VerifiedEmail(acting): VerifiedEmail,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UpdateResult>> {
    let res = roles::verify_seller(state.store.as_ref(), &acting, id).await?;
    Ok(Json(res))
}

/// DELETE /user/:id?email= (admin only)
#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    VerifiedEmail(acting): VerifiedEmail,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DeleteResult>> {
    roles::require_admin(state.store.as_ref(), &acting).await?;
    let res = User::delete(state.store.as_ref(), id).await?;
    info!(%acting, %id, deleted = res.deleted_count, "user removed");
    Ok(Json(res))
}

/// The profile body is optional; when present it must be valid JSON.
#[instrument(skip(state, body))]
pub async fn sync_google_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
    body: Bytes,
) -> AppResult<Json<UpdateResult>> {
    let email = normalize_email(&email)?;
    let profile = GoogleUserRequest::from_body(&body)?;
    let res = User::sync_google(state.store.as_ref(), &email, profile.into()).await?;
    Ok(Json(res))
}

#[instrument(skip(state))]
pub async fn admin_status(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<AdminStatus>> {
    let is_admin = roles::is_admin(state.store.as_ref(), &email.trim().to_lowercase()).await?;
    Ok(Json(AdminStatus { is_admin }))
}

#[instrument(skip(state))]
pub async fn buyer_status(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<BuyerStatus>> {
    let is_buyer = roles::is_buyer(state.store.as_ref(), &email.trim().to_lowercase()).await?;
    Ok(Json(BuyerStatus { is_buyer }))
}

#[instrument(skip(state))]
pub async fn seller_status(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> AppResult<Json<SellerStatus>> {
    let is_seller = roles::is_seller(state.store.as_ref(), &email.trim().to_lowercase()).await?;
    Ok(Json(SellerStatus { is_seller }))
}
