use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    with_id, Collection, DeleteResult, Document, DocumentStore, DuplicateKey, Filter,
    FindOptions, InsertOneResult, Update, UpdateResult,
};

/// Mirrors the unique index on `users.email`.
const UNIQUE_USER_FIELD: &str = "email";

/// Numbers compare by value, as jsonb does (`1` equals `1.0`).
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn check_unique(coll: Collection, rows: &[(Uuid, Document)], doc: &Document) -> anyhow::Result<()> {
    if coll != Collection::Users {
        return Ok(());
    }
    let Some(key) = doc.get(UNIQUE_USER_FIELD) else {
        return Ok(());
    };
    if rows.iter().any(|(_, d)| d.get(UNIQUE_USER_FIELD) == Some(key)) {
        return Err(DuplicateKey {
            collection: coll.table(),
        }
        .into());
    }
    Ok(())
}

fn matches(filter: &Filter, id: Uuid, doc: &Document) -> bool {
    match filter {
        Filter::All => true,
        Filter::Id(target) => *target == id,
        Filter::Eq(field, value) => doc.get(*field).is_some_and(|v| same_value(v, value)),
    }
}

/// In-process store for tests; rows keep insertion order.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<(Uuid, Document)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self, coll: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&coll)
            .map_or(0, |rows| rows.len())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(&self, coll: Collection, doc: Document) -> anyhow::Result<InsertOneResult> {
        let id = Uuid::new_v4();
        let mut guard = self.collections.write().await;
        let rows = guard.entry(coll).or_default();
        check_unique(coll, rows, &doc)?;
        rows.push((id, doc));
        Ok(InsertOneResult {
            acknowledged: true,
            inserted_id: id,
        })
    }

    async fn find(
        &self,
        coll: Collection,
        filter: &Filter,
        opts: FindOptions,
    ) -> anyhow::Result<Vec<Document>> {
        let guard = self.collections.read().await;
        let Some(rows) = guard.get(&coll) else {
            return Ok(Vec::new());
        };
        let mut out: Vec<Document> = rows
            .iter()
            .filter(|(id, doc)| matches(filter, *id, doc))
            .map(|(id, doc)| with_id(*id, doc.clone()))
            .collect();
        if opts.newest_first {
            out.reverse();
        }
        if let Some(limit) = opts.limit {
            out.truncate(limit.max(0) as usize);
        }
        Ok(out)
    }

    async fn update_one(
        &self,
        coll: Collection,
        filter: &Filter,
        update: Update,
    ) -> anyhow::Result<UpdateResult> {
        let mut guard = self.collections.write().await;
        let rows = guard.entry(coll).or_default();

        if let Some((_, doc)) = rows.iter_mut().find(|(id, doc)| matches(filter, *id, doc)) {
            let changed = update
                .set
                .iter()
                .any(|(k, v)| !doc.get(k).is_some_and(|cur| same_value(cur, v)));
            doc.extend(update.set);
            return Ok(UpdateResult {
                acknowledged: true,
                matched_count: 1,
                modified_count: u64::from(changed),
                upserted_count: 0,
                upserted_id: None,
            });
        }

        let mut result = UpdateResult {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_count: 0,
            upserted_id: None,
        };
        if update.upsert {
            let mut doc = update.set_on_insert;
            doc.extend(update.set);
            let id = match filter {
                Filter::Id(id) => *id,
                Filter::Eq(field, value) => {
                    doc.insert(field.to_string(), value.clone());
                    Uuid::new_v4()
                }
                Filter::All => Uuid::new_v4(),
            };
            check_unique(coll, rows, &doc)?;
            rows.push((id, doc));
            result.upserted_count = 1;
            result.upserted_id = Some(id);
        }
        Ok(result)
    }

    async fn delete_one(&self, coll: Collection, filter: &Filter) -> anyhow::Result<DeleteResult> {
        let mut guard = self.collections.write().await;
        let rows = guard.entry(coll).or_default();
        let deleted = match rows.iter().position(|(id, doc)| matches(filter, *id, doc)) {
            Some(pos) => {
                rows.remove(pos);
                1
            }
            None => 0,
        };
        Ok(DeleteResult {
            acknowledged: true,
            deleted_count: deleted,
        })
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: serde_json::Value) -> Document {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn eq_filter_matches_top_level_field_only() {
        let d = doc(json!({ "email": "a@x.com", "nested": { "email": "b@x.com" } }));
        let id = Uuid::new_v4();
        assert!(matches(&Filter::eq("email", "a@x.com"), id, &d));
        assert!(!matches(&Filter::eq("email", "b@x.com"), id, &d));
        assert!(matches(&Filter::Id(id), id, &d));
        assert!(!matches(&Filter::Id(Uuid::new_v4()), id, &d));
        assert!(matches(&Filter::All, id, &d));
    }

    #[tokio::test]
    async fn repeated_set_matches_without_modifying() {
        let store = MemoryStore::new();
        let id = store
            .insert_one(Collection::Products, doc(json!({ "status": "available" })))
            .await
            .unwrap()
            .inserted_id;

        let sold = || Update::set(doc(json!({ "status": "sold" })));
        let first = store
            .update_one(Collection::Products, &Filter::Id(id), sold())
            .await
            .unwrap();
        let second = store
            .update_one(Collection::Products, &Filter::Id(id), sold())
            .await
            .unwrap();

        assert_eq!((first.matched_count, first.modified_count), (1, 1));
        assert_eq!((second.matched_count, second.modified_count), (1, 0));
        assert_eq!(store.count(Collection::Products).await, 1);
    }

    #[tokio::test]
    async fn upsert_by_key_inserts_once() {
        let store = MemoryStore::new();
        let filter = Filter::eq("email", "a@x.com");
        let update = || {
            Update::upsert(
                doc(json!({ "name": "A" })),
                doc(json!({ "userType": "buyer" })),
            )
        };

        let first = store.update_one(Collection::Users, &filter, update()).await.unwrap();
        let second = store.update_one(Collection::Users, &filter, update()).await.unwrap();

        assert_eq!(first.upserted_count, 1);
        assert_eq!(second.matched_count, 1);
        assert_eq!(store.count(Collection::Users).await, 1);

        let stored = store.find_one(Collection::Users, &filter).await.unwrap().unwrap();
        assert_eq!(stored.get("userType"), Some(&json!("buyer")));
        assert_eq!(stored.get("email"), Some(&json!("a@x.com")));
    }

    #[tokio::test]
    async fn plain_update_on_missing_id_matches_nothing() {
        let store = MemoryStore::new();
        let res = store
            .update_one(
                Collection::Bookings,
                &Filter::Id(Uuid::new_v4()),
                Update::set(doc(json!({ "paid": true }))),
            )
            .await
            .unwrap();
        assert_eq!(res.matched_count, 0);
        assert_eq!(res.upserted_id, None);
        assert_eq!(store.count(Collection::Bookings).await, 0);
    }

    #[tokio::test]
    async fn array_subset_and_numeric_equality_follow_jsonb() {
        let store = MemoryStore::new();
        let id = store
            .insert_one(Collection::Products, doc(json!({ "tags": [1, 2], "price": 1 })))
            .await
            .unwrap()
            .inserted_id;

        let res = store
            .update_one(Collection::Products, &Filter::Id(id), Update::set(doc(json!({ "tags": [1] }))))
            .await
            .unwrap();
        assert_eq!(res.modified_count, 1);

        let res = store
            .update_one(Collection::Products, &Filter::Id(id), Update::set(doc(json!({ "price": 1.0 }))))
            .await
            .unwrap();
        assert_eq!(res.modified_count, 0);
        assert!(store
            .find_one(Collection::Products, &Filter::eq("price", 1.0))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn duplicate_user_email_is_rejected() {
        let store = MemoryStore::new();
        let user = || doc(json!({ "email": "a@x.com" }));
        store.insert_one(Collection::Users, user()).await.unwrap();

        let err = store.insert_one(Collection::Users, user()).await.unwrap_err();
        assert!(err.downcast_ref::<DuplicateKey>().is_some());
        assert_eq!(store.count(Collection::Users).await, 1);

        store.insert_one(Collection::Blogs, user()).await.unwrap();
        store.insert_one(Collection::Blogs, user()).await.unwrap();
    }

    #[tokio::test]
    async fn find_newest_with_limit() {
        let store = MemoryStore::new();
        for n in 0..5 {
            store
                .insert_one(Collection::Blogs, doc(json!({ "n": n })))
                .await
                .unwrap();
        }
        let latest = store
            .find(Collection::Blogs, &Filter::All, FindOptions::newest(3))
            .await
            .unwrap();
        let ns: Vec<_> = latest.iter().map(|d| d["n"].clone()).collect();
        assert_eq!(ns, vec![json!(4), json!(3), json!(2)]);
    }

    #[tokio::test]
    async fn delete_removes_single_document() {
        let store = MemoryStore::new();
        let id = store
            .insert_one(Collection::Wishlist, doc(json!({ "buyerEmail": "b@x.com" })))
            .await
            .unwrap()
            .inserted_id;
        let res = store.delete_one(Collection::Wishlist, &Filter::Id(id)).await.unwrap();
        assert_eq!(res.deleted_count, 1);
        let res = store.delete_one(Collection::Wishlist, &Filter::Id(id)).await.unwrap();
        assert_eq!(res.deleted_count, 0);
    }
}
