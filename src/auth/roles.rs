use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    store::{DocumentStore, UpdateResult},
    users::repo::{User, UserType},
};

/// Capabilities answered from a stored user's `role` / `userType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Admin,
    Buyer,
    Seller,
}

impl Capability {
    fn granted_to(self, user: &User) -> bool {
        match self {
            Capability::Admin => user.is_admin(),
            Capability::Buyer => user.user_type == Some(UserType::Buyer),
            Capability::Seller => user.user_type == Some(UserType::Seller),
        }
    }
}

/// An unknown email simply has no capabilities.
pub async fn has_capability(
    store: &dyn DocumentStore,
    email: &str,
    capability: Capability,
) -> anyhow::Result<bool> {
    let user = User::find_by_email(store, email).await?;
    Ok(user.is_some_and(|u| capability.granted_to(&u)))
}

pub async fn is_admin(store: &dyn DocumentStore, email: &str) -> anyhow::Result<bool> {
    has_capability(store, email, Capability::Admin).await
}

pub async fn is_buyer(store: &dyn DocumentStore, email: &str) -> anyhow::Result<bool> {
    has_capability(store, email, Capability::Buyer).await
}

pub async fn is_seller(store: &dyn DocumentStore, email: &str) -> anyhow::Result<bool> {
    has_capability(store, email, Capability::Seller).await
}

pub async fn require_admin(store: &dyn DocumentStore, email: &str) -> AppResult<()> {
    if is_admin(store, email).await? {
        Ok(())
    } else {
        warn!(%email, "admin capability required");
        Err(AppError::Forbidden)
    }
}

/// Marks a seller as verified on behalf of an admin.
pub async fn verify_seller(
    store: &dyn DocumentStore,
    acting_email: &str,
    target: Uuid,
) -> AppResult<UpdateResult> {
    require_admin(store, acting_email).await?;
    let res = User::mark_verified(store, target).await?;
    if res.matched_count == 0 {
        return Err(AppError::NotFound("user"));
    }
    info!(%acting_email, %target, "seller verified");
    Ok(res)
}
