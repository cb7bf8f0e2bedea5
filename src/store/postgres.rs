use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::info;

use super::{Document, DocumentStore, Key, ScanFilter, SortCondition, StoreError};

/// Postgres-backed document store.
///
/// All collections share one `documents` table keyed by
/// (collection, partition_key, sort_key) with the document kept as JSONB.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection    TEXT  NOT NULL,
        partition_key TEXT  NOT NULL,
        sort_key      TEXT  NOT NULL DEFAULT '',
        body          JSONB NOT NULL,
        PRIMARY KEY (collection, partition_key, sort_key)
    )
"#;

impl PgDocumentStore {
    /// Connect to `database_url` and make sure the documents table exists
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let url = url::Url::parse(database_url).map_err(|_| StoreError::InvalidDatabaseUrl)?;
        if !matches!(url.scheme(), "postgres" | "postgresql") {
            return Err(StoreError::InvalidDatabaseUrl);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url.as_str())
            .await?;

        info!(
            "Created document store pool for: {}",
            url.path().trim_start_matches('/')
        );

        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Closed document store pool");
    }

    fn document(table: &str, row: &PgRow) -> Result<Document, StoreError> {
        let Json(body): Json<Value> = row.try_get("body")?;
        match body {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::Corrupt {
                table: table.to_string(),
                message: format!("expected object, found {}", other),
            }),
        }
    }

    fn documents(table: &str, rows: Vec<PgRow>) -> Result<Vec<Document>, StoreError> {
        rows.iter().map(|row| Self::document(table, row)).collect()
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, table: &str, key: &Key) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query(
            "SELECT body FROM documents WHERE collection = $1 AND partition_key = $2 AND sort_key = $3",
        )
        .bind(table)
        .bind(&key.partition)
        .bind(&key.sort)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::document(table, &r)).transpose()
    }

    async fn query(
        &self,
        table: &str,
        partition: &str,
        sort: &SortCondition,
    ) -> Result<Vec<Document>, StoreError> {
        let rows = match sort {
            SortCondition::Any => {
                sqlx::query(
                    "SELECT body FROM documents WHERE collection = $1 AND partition_key = $2 ORDER BY sort_key",
                )
                .bind(table)
                .bind(partition)
                .fetch_all(&self.pool)
                .await?
            }
            SortCondition::Equals(value) => {
                sqlx::query(
                    "SELECT body FROM documents WHERE collection = $1 AND partition_key = $2 AND sort_key = $3",
                )
                .bind(table)
                .bind(partition)
                .bind(value)
                .fetch_all(&self.pool)
                .await?
            }
            SortCondition::BeginsWith(prefix) => {
                sqlx::query(
                    "SELECT body FROM documents WHERE collection = $1 AND partition_key = $2 AND starts_with(sort_key, $3) ORDER BY sort_key",
                )
                .bind(table)
                .bind(partition)
                .bind(prefix)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Self::documents(table, rows)
    }

    async fn scan(&self, table: &str, filter: &ScanFilter) -> Result<Vec<Document>, StoreError> {
        let rows = match filter {
            ScanFilter::All => {
                sqlx::query("SELECT body FROM documents WHERE collection = $1")
                    .bind(table)
                    .fetch_all(&self.pool)
                    .await?
            }
            ScanFilter::FieldEquals { field, value } => {
                sqlx::query("SELECT body FROM documents WHERE collection = $1 AND body->>$2 = $3")
                    .bind(table)
                    .bind(field)
                    .bind(value)
                    .fetch_all(&self.pool)
                    .await?
            }
            ScanFilter::PartitionBeginsWith(prefix) => {
                sqlx::query(
                    "SELECT body FROM documents WHERE collection = $1 AND starts_with(partition_key, $2)",
                )
                .bind(table)
                .bind(prefix)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Self::documents(table, rows)
    }

    async fn put(&self, table: &str, key: &Key, doc: Document) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, partition_key, sort_key, body)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (collection, partition_key, sort_key) DO UPDATE SET body = EXCLUDED.body
            "#,
        )
        .bind(table)
        .bind(&key.partition)
        .bind(&key.sort)
        .bind(Json(Value::Object(doc)))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert(&self, table: &str, key: &Key, doc: Document) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, partition_key, sort_key, body)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (collection, partition_key, sort_key) DO NOTHING
            "#,
        )
        .bind(table)
        .bind(&key.partition)
        .bind(&key.sort)
        .bind(Json(Value::Object(doc)))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update(
        &self,
        table: &str,
        key: &Key,
        changes: Document,
    ) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE documents SET body = body || $4
            WHERE collection = $1 AND partition_key = $2 AND sort_key = $3
            RETURNING body
            "#,
        )
        .bind(table)
        .bind(&key.partition)
        .bind(&key.sort)
        .bind(Json(Value::Object(changes)))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::document(table, &r)).transpose()
    }

    async fn delete(&self, table: &str, key: &Key) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM documents WHERE collection = $1 AND partition_key = $2 AND sort_key = $3",
        )
        .bind(table)
        .bind(&key.partition)
        .bind(&key.sort)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
