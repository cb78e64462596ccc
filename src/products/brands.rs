use axum::{extract::State, routing::get, Router};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    error::AppResult,
    extract::{Json, Path},
    state::AppState,
    store::{from_document, Collection, Document, DocumentStore, Filter, FindOptions},
};

/// Brand (category) document; seeded out of band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: Document,
}

impl Brand {
    pub async fn list_all(store: &dyn DocumentStore) -> anyhow::Result<Vec<Brand>> {
        store
            .find(Collection::Categories, &Filter::All, FindOptions::default())
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub async fn find_by_id(store: &dyn DocumentStore, id: Uuid) -> anyhow::Result<Option<Brand>> {
        store
            .find_one(Collection::Categories, &Filter::Id(id))
            .await?
            .map(from_document)
            .transpose()
    }
}

pub fn brand_routes() -> Router<AppState> {
    Router::new()
        .route("/brands", get(list_brands))
        .route("/brand/:id", get(get_brand))
}

#[instrument(skip(state))]
pub async fn list_brands(State(state): State<AppState>) -> AppResult<Json<Vec<Brand>>> {
    Ok(Json(Brand::list_all(state.store.as_ref()).await?))
}

#[instrument(skip(state))]
pub async fn get_brand(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Option<Brand>>> {
    Ok(Json(Brand::find_by_id(state.store.as_ref(), id).await?))
}
