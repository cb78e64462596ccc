use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Query},
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::Deserialize;
use tracing::warn;

use super::{claims::Claims, jwt::JwtKeys};
use crate::error::AppError;

/// Stage one of the access gate: a valid `Bearer` token.
///
/// A missing header is `401`; anything else that fails is `403`. The
/// decoded claims are cached in the request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(claims) = parts.extensions.get::<Claims>() {
            return Ok(AuthUser(claims.clone()));
        }

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AppError::Unauthenticated)?;

        let token = header
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                warn!("malformed Authorization header");
                AppError::Forbidden
            })?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Forbidden
        })?;

        parts.extensions.insert(claims.clone());
        Ok(AuthUser(claims))
    }
}

#[derive(Debug, Deserialize)]
struct EmailQuery {
    email: Option<String>,
}

/// Stage two: the token's email must equal the `email` query parameter.
/// Runs [`AuthUser`] first, so it can be used on its own.
#[derive(Debug, Clone)]
pub struct VerifiedEmail(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for VerifiedEmail
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;

        let Query(query) = Query::<EmailQuery>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::Forbidden)?;

        let token_email = claims.email.trim().to_lowercase();
        let requested = query.email.map(|e| e.trim().to_lowercase());
        if requested.as_deref() != Some(token_email.as_str()) {
            warn!(token_email = %token_email, requested = ?requested, "email mismatch");
            return Err(AppError::Forbidden);
        }

        Ok(VerifiedEmail(token_email))
    }
}
