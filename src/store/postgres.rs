use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{
    postgres::{PgArguments, PgPoolOptions},
    types::Json,
    Arguments, Encode, PgPool, Postgres, Type,
};
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    with_id, Collection, DeleteResult, Document, DocumentStore, DuplicateKey, Filter,
    FindOptions, InsertOneResult, Update, UpdateResult,
};
use crate::config::DatabaseConfig;

/// Collections as `(id UUID, doc JSONB)` tables in PostgreSQL.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .connect(&cfg.url)
            .await
            .context("connect to database")?;
        info!(max_connections = cfg.max_connections, "database pool ready");
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

/// Positional bind parameters for a dynamically built statement.
#[derive(Default)]
struct Params {
    args: PgArguments,
    n: usize,
}

impl Params {
    fn bind<T>(&mut self, value: T) -> String
    where
        T: for<'q> Encode<'q, Postgres> + Type<Postgres> + Send + 'static,
    {
        self.args.add(value);
        self.n += 1;
        format!("${}", self.n)
    }
}

fn filter_sql(filter: &Filter, params: &mut Params) -> String {
    match filter {
        Filter::All => "TRUE".to_string(),
        Filter::Id(id) => format!("id = {}", params.bind(*id)),
        Filter::Eq(field, value) => {
            let field = params.bind(field.to_string());
            let value = params.bind(Json(value.clone()));
            format!("doc -> {field} = {value}")
        }
    }
}

/// Unique-index collisions surface as [`DuplicateKey`]; anything else keeps
/// its context.
fn write_error(coll: Collection, action: &str, e: sqlx::Error) -> anyhow::Error {
    let unique = e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if unique {
        anyhow::Error::new(DuplicateKey {
            collection: coll.table(),
        })
    } else {
        anyhow::Error::new(e).context(format!("{action} {}", coll.table()))
    }
}

fn order_sql(newest_first: bool) -> &'static str {
    if newest_first {
        "ORDER BY seq DESC"
    } else {
        "ORDER BY seq ASC"
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert_one(&self, coll: Collection, doc: Document) -> anyhow::Result<InsertOneResult> {
        let sql = format!("INSERT INTO {} (doc) VALUES ($1) RETURNING id", coll.table());
        let id: Uuid = sqlx::query_scalar(&sql)
            .bind(Json(doc))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| write_error(coll, "insert into", e))?;
        debug!(collection = coll.table(), %id, "document inserted");
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
        let mut params = Params::default();
        let cond = filter_sql(filter, &mut params);
        let mut sql = format!(
            "SELECT id, doc FROM {} WHERE {cond} {}",
            coll.table(),
            order_sql(opts.newest_first)
        );
        if let Some(limit) = opts.limit {
            sql.push_str(&format!(" LIMIT {}", params.bind(limit)));
        }

        let rows: Vec<(Uuid, Json<Document>)> = sqlx::query_as_with(&sql, params.args)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("find in {}", coll.table()))?;
        Ok(rows.into_iter().map(|(id, Json(doc))| with_id(id, doc)).collect())
    }

    async fn update_one(
        &self,
        coll: Collection,
        filter: &Filter,
        update: Update,
    ) -> anyhow::Result<UpdateResult> {
        let table = coll.table();
        let mut params = Params::default();
        let cond = filter_sql(filter, &mut params);
        let set = params.bind(Json(update.set.clone()));
        let sql = format!(
            r#"
            WITH target AS (
                SELECT id, (doc || {set}) = doc AS unchanged
                  FROM {table}
                 WHERE {cond}
                 ORDER BY seq ASC
                 LIMIT 1
                   FOR UPDATE
            ), updated AS (
                UPDATE {table} t
                   SET doc = t.doc || {set}, updated_at = now()
                  FROM target
                 WHERE t.id = target.id AND NOT target.unchanged
             RETURNING t.id
            )
            SELECT (SELECT count(*) FROM target), (SELECT count(*) FROM updated)
            "#
        );

        let mut tx = self.pool.begin().await.context("begin tx")?;
        let (matched, modified): (i64, i64) = sqlx::query_as_with(&sql, params.args)
            .fetch_one(&mut *tx)
            .await
            .with_context(|| format!("update {table}"))?;

        let mut result = UpdateResult {
            acknowledged: true,
            matched_count: matched as u64,
            modified_count: modified as u64,
            upserted_count: 0,
            upserted_id: None,
        };

        if matched == 0 && update.upsert {
            let mut doc = update.set_on_insert;
            doc.extend(update.set);
            let explicit_id = match filter {
                Filter::Id(id) => Some(*id),
                Filter::Eq(field, value) => {
                    doc.insert(field.to_string(), value.clone());
                    None
                }
                Filter::All => None,
            };
            let insert = format!(
                "INSERT INTO {table} (id, doc) VALUES (COALESCE($1, gen_random_uuid()), $2) RETURNING id"
            );
            let id: Uuid = sqlx::query_scalar(&insert)
                .bind(explicit_id)
                .bind(Json(doc))
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| write_error(coll, "upsert into", e))?;
            result.upserted_count = 1;
            result.upserted_id = Some(id);
        }

        tx.commit().await.context("commit tx")?;
        debug!(collection = table, ?result, "document updated");
        Ok(result)
    }

    async fn delete_one(&self, coll: Collection, filter: &Filter) -> anyhow::Result<DeleteResult> {
        let table = coll.table();
        let mut params = Params::default();
        let cond = filter_sql(filter, &mut params);
        let sql = format!(
            r#"
            DELETE FROM {table}
             WHERE id = (
                SELECT id FROM {table} WHERE {cond} ORDER BY seq ASC LIMIT 1
             )
            "#
        );
        let done = sqlx::query_with(&sql, params.args)
            .execute(&self.pool)
            .await
            .with_context(|| format!("delete from {table}"))?;
        Ok(DeleteResult {
            acknowledged: true,
            deleted_count: done.rows_affected(),
        })
    }

    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("ping database")?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("database pool closed");
    }
}
