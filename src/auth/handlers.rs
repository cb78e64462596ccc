use axum::{
    extract::{FromRef, State},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::jwt::JwtKeys;
use crate::{error::AppResult, extract::Json, state::AppState, validate::normalize_email};

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

pub fn token_routes() -> Router<AppState> {
    Router::new().route("/jwt", post(issue_token))
}

/// Signs a one-day token for the given email (`POST /jwt`).
#[instrument(skip(state, payload))]
pub async fn issue_token(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    let email = normalize_email(&payload.email)?;
    let keys = JwtKeys::from_ref(&state);
    let token = keys.issue(&email)?;
    info!(%email, "token issued");
    Ok(Json(TokenResponse { token }))
}
