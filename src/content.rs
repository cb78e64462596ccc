//! Promotional ads and blog posts. Both are read-mostly and carry
//! whatever fields the admin dashboard stores.

use axum::{extract::State, routing::get, routing::post, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    extract::Json,
    state::AppState,
    store::{
        from_document, Collection, Document, DocumentStore, Filter, FindOptions, InsertOneResult,
        ID_FIELD,
    },
};

const FEATURED: i64 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdsProduct {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: Document,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlogPost {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: Document,
}

async fn list<T: serde::de::DeserializeOwned>(
    store: &dyn DocumentStore,
    coll: Collection,
    opts: FindOptions,
) -> anyhow::Result<Vec<T>> {
    store
        .find(coll, &Filter::All, opts)
        .await?
        .into_iter()
        .map(from_document)
        .collect()
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v2/adsproduct", post(create_ad))
        .route("/adsproduct", get(list_ads))
        .route("/adsproduct3", get(featured_ads))
        .route("/blogs", get(list_blogs))
        .route("/blogs3", get(featured_blogs))
}

#[instrument(skip(state, payload))]
pub async fn create_ad(
    State(state): State<AppState>,
    Json(mut payload): Json<Document>,
) -> AppResult<Json<InsertOneResult>> {
    payload.remove(ID_FIELD);
    if payload.is_empty() {
        return Err(AppError::Validation("ad must not be empty".into()));
    }
    let res = state.store.insert_one(Collection::AdsProducts, payload).await?;
    info!(id = %res.inserted_id, "ad published");
    Ok(Json(res))
}

#[instrument(skip(state))]
pub async fn list_ads(State(state): State<AppState>) -> AppResult<Json<Vec<AdsProduct>>> {
    let ads = list(state.store.as_ref(), Collection::AdsProducts, FindOptions::default()).await?;
    Ok(Json(ads))
}

/// The three newest ads.
#[instrument(skip(state))]
pub async fn featured_ads(State(state): State<AppState>) -> AppResult<Json<Vec<AdsProduct>>> {
    let ads = list(state.store.as_ref(), Collection::AdsProducts, FindOptions::newest(FEATURED)).await?;
    Ok(Json(ads))
}

#[instrument(skip(state))]
pub async fn list_blogs(State(state): State<AppState>) -> AppResult<Json<Vec<BlogPost>>> {
    let posts = list(state.store.as_ref(), Collection::Blogs, FindOptions::default()).await?;
    Ok(Json(posts))
}

#[instrument(skip(state))]
pub async fn featured_blogs(State(state): State<AppState>) -> AppResult<Json<Vec<BlogPost>>> {
    let posts = list(state.store.as_ref(), Collection::Blogs, FindOptions::newest(FEATURED)).await?;
    Ok(Json(posts))
}
