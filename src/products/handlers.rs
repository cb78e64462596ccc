use axum::{
    extract::State,
    routing::{delete, get, post, put},
    Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{BrandQuery, CreateProductRequest},
    repo::{Product, ProductStatus},
};
use crate::{
    auth::extractors::VerifiedEmail,
    error::{AppError, AppResult},
    extract::{Json, Path, Query},
    state::AppState,
    store::{DeleteResult, InsertOneResult, UpdateResult},
};

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/addproducts", post(add_product))
        .route("/products", get(list_products))
        .route("/product", get(products_by_brand))
        .route("/myproduct", get(my_products))
        .route("/myproduct/:id", delete(delete_product))
        .route("/productsold/:id", put(mark_sold))
        .route("/productavailable/:id", put(mark_available))
        .route("/products/:id", put(advertise_product))
}

#[instrument(skip(state, payload))]
pub async fn add_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<Json<InsertOneResult>> {
    let product = payload.validate()?;
    let res = Product::create(state.store.as_ref(), &product).await?;
    info!(seller = %product.seller_email, brand = %product.brand, id = %res.inserted_id, "product listed");
    Ok(Json(res))
}

#[instrument(skip(state))]
pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(Product::list_all(state.store.as_ref()).await?))
}

#[instrument(skip(state))]
pub async fn products_by_brand(
    State(state): State<AppState>,
    Query(q): Query<BrandQuery>,
) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(Product::list_by_brand(state.store.as_ref(), &q.brand).await?))
}

/// The caller's own listings (`GET /myproduct?email=`).
#[instrument(skip(state))]
pub async fn my_products(
    State(state): State<AppState>,
    VerifiedEmail(email): VerifiedEmail,
) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(Product::list_by_seller(state.store.as_ref(), &email).await?))
}

#[instrument(skip(state))]
pub async fn mark_sold(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UpdateResult>> {
    update_status(&state, id, ProductStatus::Sold).await
}

#[instrument(skip(state))]
pub async fn mark_available(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UpdateResult>> {
    update_status(&state, id, ProductStatus::Available).await
}

async fn update_status(
    state: &AppState,
    id: Uuid,
    status: ProductStatus,
) -> AppResult<Json<UpdateResult>> {
    let res = Product::set_status(state.store.as_ref(), id, status).await?;
    if res.matched_count == 0 {
        return Err(AppError::NotFound("product"));
    }
    info!(%id, status = status.as_str(), "product status updated");
    Ok(Json(res))
}

/// Promote a listing to the ads carousel (`PUT /products/:id`).
#[instrument(skip(state))]
pub async fn advertise_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UpdateResult>> {
    let res = Product::mark_advertised(state.store.as_ref(), id).await?;
    if res.matched_count == 0 {
        return Err(AppError::NotFound("product"));
    }
    Ok(Json(res))
}

#[instrument(skip(state))]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DeleteResult>> {
    Ok(Json(Product::delete(state.store.as_ref(), id).await?))
}
