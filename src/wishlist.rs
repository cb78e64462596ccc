use axum::{
    extract::State,
    routing::{delete, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        extractors::{AuthUser, VerifiedEmail},
        roles,
    },
    error::{AppError, AppResult},
    extract::{Json, Path},
    state::AppState,
    store::{
        from_document, to_document, Collection, DeleteResult, Document, DocumentStore, Filter,
        FindOptions, InsertOneResult, ID_FIELD,
    },
    validate::{normalize_email, require_non_empty},
};

/// A product saved by a buyer for later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub buyer_email: String,
    pub product_id: String,
    #[serde(flatten)]
    pub extra: Document,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWishlistEntry {
    pub buyer_email: String,
    pub product_id: String,
    #[serde(flatten)]
    pub extra: Document,
}

impl NewWishlistEntry {
    fn validate(mut self) -> Result<Self, AppError> {
        self.extra.remove(ID_FIELD);
        Ok(Self {
            buyer_email: normalize_email(&self.buyer_email)?,
            product_id: require_non_empty("productId", &self.product_id)?,
            extra: self.extra,
        })
    }
}

impl WishlistEntry {
    pub async fn create(store: &dyn DocumentStore, entry: &NewWishlistEntry) -> anyhow::Result<InsertOneResult> {
        store.insert_one(Collection::Wishlist, to_document(entry)?).await
    }

    pub async fn find_by_id(store: &dyn DocumentStore, id: Uuid) -> anyhow::Result<Option<WishlistEntry>> {
        store
            .find_one(Collection::Wishlist, &Filter::Id(id))
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn list_by_buyer(store: &dyn DocumentStore, email: &str) -> anyhow::Result<Vec<WishlistEntry>> {
        store
            .find(Collection::Wishlist, &Filter::eq("buyerEmail", email), FindOptions::default())
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub async fn delete(store: &dyn DocumentStore, id: Uuid) -> anyhow::Result<DeleteResult> {
        store.delete_one(Collection::Wishlist, &Filter::Id(id)).await
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/wishlist", post(add_to_wishlist).get(my_wishlist))
        .route("/mywishlist/:id", delete(remove_from_wishlist))
}

/// Only a buyer may save, and only for themselves (`POST /wishlist`).
#[instrument(skip(state, payload))]
pub async fn add_to_wishlist(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<NewWishlistEntry>,
) -> AppResult<Json<InsertOneResult>> {
    let entry = payload.validate()?;
    if entry.buyer_email != claims.email.to_lowercase()
        || !roles::is_buyer(state.store.as_ref(), &entry.buyer_email).await?
    {
        warn!(token_email = %claims.email, buyer = %entry.buyer_email, "wishlist write denied");
        return Err(AppError::Forbidden);
    }
    let res = WishlistEntry::create(state.store.as_ref(), &entry).await?;
    info!(buyer = %entry.buyer_email, product = %entry.product_id, "wishlist entry added");
    Ok(Json(res))
}

#[instrument(skip(state))]
pub async fn my_wishlist(
    State(state): State<AppState>,
    VerifiedEmail(email): VerifiedEmail,
) -> AppResult<Json<Vec<WishlistEntry>>> {
    Ok(Json(WishlistEntry::list_by_buyer(state.store.as_ref(), &email).await?))
}

#[instrument(skip(state))]
pub async fn remove_from_wishlist(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DeleteResult>> {
    let Some(entry) = WishlistEntry::find_by_id(state.store.as_ref(), id).await? else {
        return Err(AppError::NotFound("wishlist entry"));
    };
    if entry.buyer_email != claims.email.to_lowercase() {
        warn!(token_email = %claims.email, %id, "wishlist delete denied");
        return Err(AppError::Forbidden);
    }
    Ok(Json(WishlistEntry::delete(state.store.as_ref(), id).await?))
}
