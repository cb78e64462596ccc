use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgDocumentStore;

/// A JSON object as stored in a collection, without its `_id`.
pub type Document = Map<String, Value>;

pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Categories,
    Products,
    Bookings,
    Wishlist,
    AdsProducts,
    Blogs,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Categories => "categories",
            Collection::Products => "products",
            Collection::Bookings => "bookings",
            Collection::Wishlist => "wishlist",
            Collection::AdsProducts => "ads_products",
            Collection::Blogs => "blogs",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Id(Uuid),
    /// Equality on a single top-level field.
    Eq(&'static str, Value),
}

impl Filter {
    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Filter::Eq(field, value.into())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions {
    pub limit: Option<i64>,
    pub newest_first: bool,
}

impl FindOptions {
    pub fn newest(limit: i64) -> Self {
        Self {
            limit: Some(limit),
            newest_first: true,
        }
    }
}

/// `$set` / `$setOnInsert` pair for [`DocumentStore::update_one`].
#[derive(Debug, Clone, Default)]
pub struct Update {
    pub set: Document,
    pub set_on_insert: Document,
    pub upsert: bool,
}

impl Update {
    pub fn set(set: Document) -> Self {
        Self {
            set,
            ..Self::default()
        }
    }

    pub fn upsert(set: Document, set_on_insert: Document) -> Self {
        Self {
            set,
            set_on_insert,
            upsert: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOneResult {
    pub acknowledged: bool,
    pub inserted_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// A write collided with a unique index (e.g. a user's email).
#[derive(Debug, thiserror::Error)]
#[error("duplicate key in {collection}")]
pub struct DuplicateKey {
    pub collection: &'static str,
}

/// Collection-oriented persistence used by every handler.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_one(&self, coll: Collection, doc: Document) -> anyhow::Result<InsertOneResult>;

    async fn find(
        &self,
        coll: Collection,
        filter: &Filter,
        opts: FindOptions,
    ) -> anyhow::Result<Vec<Document>>;

    async fn find_one(&self, coll: Collection, filter: &Filter) -> anyhow::Result<Option<Document>> {
        let opts = FindOptions {
            limit: Some(1),
            newest_first: false,
        };
        Ok(self.find(coll, filter, opts).await?.into_iter().next())
    }

    /// Updates the first matching document. With `update.upsert` a miss
    /// inserts `set_on_insert` merged with `set` (plus the filter's field or id).
    async fn update_one(
        &self,
        coll: Collection,
        filter: &Filter,
        update: Update,
    ) -> anyhow::Result<UpdateResult>;

    async fn delete_one(&self, coll: Collection, filter: &Filter) -> anyhow::Result<DeleteResult>;

    async fn ping(&self) -> anyhow::Result<()>;

    async fn close(&self) {}
}

/// Serializes an entity into a stored document, dropping any `_id`.
pub fn to_document<T: Serialize>(value: &T) -> anyhow::Result<Document> {
    match serde_json::to_value(value)? {
        Value::Object(mut map) => {
            map.remove(ID_FIELD);
            Ok(map)
        }
        other => anyhow::bail!("expected a JSON object, got {other}"),
    }
}

/// Decodes a document returned by the store (which carries `_id`).
pub fn from_document<T: DeserializeOwned>(doc: Document) -> anyhow::Result<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// Attaches `_id` to a stored document before it leaves the store.
pub(crate) fn with_id(id: Uuid, mut doc: Document) -> Document {
    doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    doc
}
