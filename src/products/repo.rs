use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::store::{
    from_document, to_document, Collection, DeleteResult, Document, DocumentStore, Filter,
    FindOptions, InsertOneResult, Update, UpdateResult,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Available,
    Sold,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Available => "available",
            ProductStatus::Sold => "sold",
        }
    }
}

/// A laptop listing. Seller-supplied listing fields ride along in `listing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub seller_email: String,
    pub brand: String,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub ads: bool,
    #[serde(flatten)]
    pub listing: Document,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub seller_email: String,
    pub brand: String,
    pub status: ProductStatus,
    pub ads: bool,
    #[serde(flatten)]
    pub listing: Document,
}

impl Product {
    pub async fn create(store: &dyn DocumentStore, product: &NewProduct) -> anyhow::Result<InsertOneResult> {
        store.insert_one(Collection::Products, to_document(product)?).await
    }

    pub async fn list_all(store: &dyn DocumentStore) -> anyhow::Result<Vec<Product>> {
        Self::find_many(store, Filter::All).await
    }

    pub async fn list_by_brand(store: &dyn DocumentStore, brand: &str) -> anyhow::Result<Vec<Product>> {
        Self::find_many(store, Filter::eq("brand", brand)).await
    }

    pub async fn list_by_seller(store: &dyn DocumentStore, email: &str) -> anyhow::Result<Vec<Product>> {
        Self::find_many(store, Filter::eq("sellerEmail", email)).await
    }

    pub async fn set_status(
        store: &dyn DocumentStore,
        id: Uuid,
        status: ProductStatus,
    ) -> anyhow::Result<UpdateResult> {
        let mut set = Document::new();
        set.insert("status".into(), Value::String(status.as_str().into()));
        store
            .update_one(Collection::Products, &Filter::Id(id), Update::set(set))
            .await
    }

    pub async fn mark_advertised(store: &dyn DocumentStore, id: Uuid) -> anyhow::Result<UpdateResult> {
        let mut set = Document::new();
        set.insert("ads".into(), Value::Bool(true));
        store
            .update_one(Collection::Products, &Filter::Id(id), Update::set(set))
            .await
    }

    pub async fn delete(store: &dyn DocumentStore, id: Uuid) -> anyhow::Result<DeleteResult> {
        store.delete_one(Collection::Products, &Filter::Id(id)).await
    }

    async fn find_many(store: &dyn DocumentStore, filter: Filter) -> anyhow::Result<Vec<Product>> {
        store
            .find(Collection::Products, &filter, FindOptions::default())
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }
}
