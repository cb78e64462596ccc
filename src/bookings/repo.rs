use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::store::{
    from_document, to_document, Collection, DeleteResult, Document, DocumentStore, Filter,
    FindOptions, InsertOneResult, Update, UpdateResult,
};

/// A buyer's order for a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub buyer_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller_email: Option<String>,
    pub product_id: String,
    pub price: f64,
    #[serde(default)]
    pub paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(flatten)]
    pub extra: Document,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub buyer_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seller_email: Option<String>,
    pub product_id: String,
    pub price: f64,
    pub paid: bool,
    #[serde(flatten)]
    pub extra: Document,
}

impl Booking {
    pub async fn create(store: &dyn DocumentStore, booking: &NewBooking) -> anyhow::Result<InsertOneResult> {
        store.insert_one(Collection::Bookings, to_document(booking)?).await
    }

    pub async fn find_by_id(store: &dyn DocumentStore, id: Uuid) -> anyhow::Result<Option<Booking>> {
        store
            .find_one(Collection::Bookings, &Filter::Id(id))
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn list_by_buyer(store: &dyn DocumentStore, email: &str) -> anyhow::Result<Vec<Booking>> {
        Self::find_many(store, Filter::eq("buyerEmail", email)).await
    }

    pub async fn list_by_seller(store: &dyn DocumentStore, email: &str) -> anyhow::Result<Vec<Booking>> {
        Self::find_many(store, Filter::eq("sellerEmail", email)).await
    }

    pub async fn delete(store: &dyn DocumentStore, id: Uuid) -> anyhow::Result<DeleteResult> {
        store.delete_one(Collection::Bookings, &Filter::Id(id)).await
    }

    pub async fn record_payment(
        store: &dyn DocumentStore,
        id: Uuid,
        transaction_id: &str,
    ) -> anyhow::Result<UpdateResult> {
        let mut set = Document::new();
        set.insert("paid".into(), Value::Bool(true));
        set.insert("transactionId".into(), Value::String(transaction_id.into()));
        store
            .update_one(Collection::Bookings, &Filter::Id(id), Update::set(set))
            .await
    }

    async fn find_many(store: &dyn DocumentStore, filter: Filter) -> anyhow::Result<Vec<Booking>> {
        store
            .find(Collection::Bookings, &filter, FindOptions::default())
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }
}
