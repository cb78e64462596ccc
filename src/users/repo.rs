use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::store::{
    from_document, to_document, Collection, DeleteResult, Document, DocumentStore, DuplicateKey,
    Filter, FindOptions, InsertOneResult, Update, UpdateResult,
};

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Buyer,
    Seller,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Buyer => "buyer",
            UserType::Seller => "seller",
        }
    }
}

/// User document in the `users` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<UserType>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }
}

/// Validated signup payload, as stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub user_type: UserType,
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Fields refreshed on every Google sign-in.
#[derive(Debug, Clone, Default)]
pub struct GoogleProfile {
    pub name: Option<String>,
    pub image: Option<String>,
}

impl User {
    pub async fn create(store: &dyn DocumentStore, user: &NewUser) -> anyhow::Result<InsertOneResult> {
        store.insert_one(Collection::Users, to_document(user)?).await
    }

    pub async fn find_by_email(store: &dyn DocumentStore, email: &str) -> anyhow::Result<Option<User>> {
        store
            .find_one(Collection::Users, &Filter::eq("email", email))
            .await?
            .map(from_document)
            .transpose()
    }

    /// Lists users of one kind, or every user when `user_type` is `None`.
    pub async fn list(
        store: &dyn DocumentStore,
        user_type: Option<UserType>,
    ) -> anyhow::Result<Vec<User>> {
        let filter = match user_type {
            Some(kind) => Filter::eq("userType", kind.as_str()),
            None => Filter::All,
        };
        store
            .find(Collection::Users, &filter, FindOptions::default())
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    pub async fn mark_verified(store: &dyn DocumentStore, id: Uuid) -> anyhow::Result<UpdateResult> {
        let mut set = Document::new();
        set.insert("verified".into(), Value::Bool(true));
        store
            .update_one(Collection::Users, &Filter::Id(id), Update::set(set))
            .await
    }

    pub async fn delete(store: &dyn DocumentStore, id: Uuid) -> anyhow::Result<DeleteResult> {
        store.delete_one(Collection::Users, &Filter::Id(id)).await
    }

    /// Creates the account on first sign-in, otherwise refreshes the profile.
    pub async fn sync_google(
        store: &dyn DocumentStore,
        email: &str,
        profile: GoogleProfile,
    ) -> anyhow::Result<UpdateResult> {
        let mut set = Document::new();
        if let Some(name) = profile.name {
            set.insert("name".into(), Value::String(name));
        }
        if let Some(image) = profile.image {
            set.insert("image".into(), Value::String(image));
        }
        let on_insert = to_document(&json!({
            "userType": UserType::Buyer,
            "verified": false,
        }))?;
        let filter = Filter::eq("email", email);
        let update = Update::upsert(set, on_insert);
        match store.update_one(Collection::Users, &filter, update.clone()).await {
            // a concurrent first sign-in inserted the row; now it matches
            Err(e) if e.downcast_ref::<DuplicateKey>().is_some() => {
                store.update_one(Collection::Users, &filter, update).await
            }
            res => res,
        }
    }
}
