use crate::state::AppState;
use axum::Router;

pub mod claims;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod roles;

pub fn router() -> Router<AppState> {
    handlers::token_routes()
}
