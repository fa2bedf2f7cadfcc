//! PostgreSQL document store.
//!
//! One table per collection, `(id uuid, doc jsonb, created_at timestamptz)`.
//! Equality filters compare `doc -> field` against the filter value as JSONB.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::types::Json;
use url::Url;
use uuid::Uuid;

use super::{
    Collection, DeleteAck, DocumentStore, Filter, InsertAck, StoreError, StoreResult, UpdateAck,
    upsert_seed,
};
use crate::models::document::{Document, DocumentId, Fields, merge, sanitize};

/// Build a PostgreSQL connection URL from discrete credentials.
///
/// Credentials are percent-encoded, so passwords may contain `@`, `/` or `:`.
pub fn connection_url(
    user: &str,
    password: Option<&str>,
    host: &str,
    database: &str,
) -> Result<String, StoreError> {
    let mut url = Url::parse(&format!("postgres://{host}/"))
        .map_err(|e| StoreError::Backend(format!("invalid database host {host:?}: {e}")))?;
    url.set_username(user)
        .map_err(|_| StoreError::Backend("cannot set database user".into()))?;
    url.set_password(password)
        .map_err(|_| StoreError::Backend("cannot set database password".into()))?;
    url.set_path(database);
    Ok(url.to_string())
}

#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create or upgrade the collection tables from the migrations embedded
    /// out of `migrations/`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

type Row = (Uuid, Json<Fields>);

fn into_document((id, Json(fields)): Row) -> Document {
    Document::new(DocumentId::from(id), fields)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn find(
        &self,
        collection: Collection,
        filter: Option<&Filter>,
    ) -> StoreResult<Vec<Document>> {
        let table = collection.name();
        let rows = match filter {
            None => {
                sqlx::query_as::<_, Row>(&format!(
                    "SELECT id, doc FROM {table} ORDER BY created_at, id"
                ))
                .fetch_all(&self.pool)
                .await?
            }
            Some(f) => {
                sqlx::query_as::<_, Row>(&format!(
                    "SELECT id, doc FROM {table} WHERE doc -> $1 = $2 ORDER BY created_at, id"
                ))
                .bind(&f.field)
                .bind(Json(&f.value))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(into_document).collect())
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> StoreResult<Option<Document>> {
        let table = collection.name();
        let row = sqlx::query_as::<_, Row>(&format!(
            "SELECT id, doc FROM {table} WHERE doc -> $1 = $2 ORDER BY created_at, id LIMIT 1"
        ))
        .bind(&filter.field)
        .bind(Json(&filter.value))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(into_document))
    }

    async fn find_by_id(
        &self,
        collection: Collection,
        id: DocumentId,
    ) -> StoreResult<Option<Document>> {
        let table = collection.name();
        let row = sqlx::query_as::<_, Row>(&format!("SELECT id, doc FROM {table} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(into_document))
    }

    async fn insert_one(&self, collection: Collection, fields: Fields) -> StoreResult<InsertAck> {
        let table = collection.name();
        let id = DocumentId::generate();
        sqlx::query(&format!("INSERT INTO {table} (id, doc) VALUES ($1, $2)"))
            .bind(id.as_uuid())
            .bind(Json(sanitize(fields)))
            .execute(&self.pool)
            .await?;
        Ok(InsertAck {
            acknowledged: true,
            inserted_id: id,
        })
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        set: Fields,
        upsert: bool,
    ) -> StoreResult<UpdateAck> {
        let table = collection.name();
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Row>(&format!(
            "SELECT id, doc FROM {table} WHERE doc -> $1 = $2 \
             ORDER BY created_at, id LIMIT 1 FOR UPDATE"
        ))
        .bind(&filter.field)
        .bind(Json(&filter.value))
        .fetch_optional(&mut *tx)
        .await?;

        let ack = match existing {
            Some((id, Json(mut doc))) => {
                let modified = merge(&mut doc, &set);
                if modified {
                    sqlx::query(&format!("UPDATE {table} SET doc = $2 WHERE id = $1"))
                        .bind(id)
                        .bind(Json(&doc))
                        .execute(&mut *tx)
                        .await?;
                }
                UpdateAck::matched(modified)
            }
            None if upsert => {
                let id = DocumentId::generate();
                sqlx::query(&format!("INSERT INTO {table} (id, doc) VALUES ($1, $2)"))
                    .bind(id.as_uuid())
                    .bind(Json(upsert_seed(filter, &set)))
                    .execute(&mut *tx)
                    .await?;
                UpdateAck::upserted(id)
            }
            None => UpdateAck::unmatched(),
        };

        tx.commit().await?;
        Ok(ack)
    }

    async fn delete_by_id(&self, collection: Collection, id: DocumentId) -> StoreResult<DeleteAck> {
        let table = collection.name();
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(DeleteAck {
            acknowledged: true,
            deleted_count: result.rows_affected(),
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
