
use std::time::Duration;

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use super::{NewRecord, SearchResult, VectorStore, check_dimension, check_top_k};
use crate::config::DatabaseConfig;
use crate::config::settings::is_valid_table_name;
use crate::{IndexError, Result};

const UNDEFINED_TABLE: &str = "42P01";
const UNDEFINED_OBJECT: &str = "42704";
const FEATURE_NOT_SUPPORTED: &str = "0A000";
const INVALID_PASSWORD: &str = "28P01";
const INVALID_AUTHORIZATION: &str = "28000";
const INVALID_CATALOG_NAME: &str = "3D000";
const CANNOT_CONNECT_NOW: &str = "57P03";

/// Record table in PostgreSQL with a pgvector `embedding` column.
///
/// Holds a pool limited to a single connection, so every statement runs on
/// the same session until [`VectorStore::close`] is called.
#[derive(Debug, Clone)]
pub struct PgVectorStore {
    pool: PgPool,
    table: String,
    dimension: usize,
    location: String,
}

impl PgVectorStore {
    /// Connect to the configured database.
    ///
    /// Fails with [`IndexError::Connectivity`] when the server cannot be
    /// reached or rejects the credentials.
    #[inline]
    pub async fn connect(config: &DatabaseConfig, dimension: usize) -> Result<Self> {
        if !is_valid_table_name(&config.table) {
            return Err(IndexError::Config(format!(
                "invalid table name: {}",
                config.table
            )));
        }

        let location = config.display_url();
        debug!("Connecting to {}", location);

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect_with(Self::connect_options(config))
            .await
            .map_err(|e| classify(e, &format!("connect to {}", location)))?;

        info!("Connected to {}", location);

        Ok(Self {
            pool,
            table: config.table.clone(),
            dimension,
            location,
        })
    }

    /// Connection options built from configuration; the password is only set when configured
    #[inline]
    pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.name)
            .username(&config.user)
            .application_name(env!("CARGO_PKG_NAME"));

        match &config.password {
            Some(password) => options.password(password),
            None => options,
        }
    }

    #[inline]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[inline]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// `postgres://user@host:port/name`, without the password
    #[inline]
    pub fn location(&self) -> &str {
        &self.location
    }

    fn quoted_table(&self) -> String {
        quote_identifier(&self.table)
    }

    /// Width of the existing `embedding` column, `None` when the table is absent
    async fn existing_dimension(&self) -> Result<Option<i32>> {
        let quoted = self.quoted_table();

        let exists: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
            .bind(&quoted)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "look up record table"))?;

        if !exists {
            return Ok(None);
        }

        let typmod: Option<i32> = sqlx::query_scalar(
            r#"
            SELECT a.atttypmod
            FROM pg_attribute a
            WHERE a.attrelid = to_regclass($1)
              AND a.attname = 'embedding'
              AND NOT a.attisdropped
            "#,
        )
        .bind(&quoted)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify(e, "inspect record table"))?;

        typmod.map(Some).ok_or_else(|| {
            IndexError::Schema(format!(
                "table {} exists but has no embedding column",
                self.table
            ))
        })
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn ensure_schema(&self) -> Result<()> {
        info!("Ensuring pgvector schema for table {}", self.table);

        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "enable the pgvector extension"))?;

        let create = format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             id bigserial PRIMARY KEY, \
             content text NOT NULL, \
             embedding vector({}) NOT NULL)",
            self.quoted_table(),
            self.dimension
        );
        sqlx::query(&create)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, "create record table"))?;

        match self.existing_dimension().await? {
            Some(width) if width > 0 && width as usize != self.dimension => {
                Err(IndexError::Schema(format!(
                    "table {} stores {}-dimension vectors but the embedder produces {}",
                    self.table, width, self.dimension
                )))
            }
            Some(width) => {
                if width <= 0 {
                    warn!(
                        "Table {} has an unconstrained vector column; width is checked per insert",
                        self.table
                    );
                }
                debug!("Schema for {} is ready", self.table);
                Ok(())
            }
            None => Err(IndexError::Schema(format!(
                "table {} was not created",
                self.table
            ))),
        }
    }

    async fn insert(&self, content: &str, embedding: &[f32]) -> Result<i64> {
        check_dimension(self.dimension, embedding)?;

        let statement = format!(
            "INSERT INTO {} (content, embedding) VALUES ($1, $2) RETURNING id",
            self.quoted_table()
        );

        let id: i64 = sqlx::query_scalar(&statement)
            .bind(content)
            .bind(to_vector(embedding))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "insert record"))?;

        debug!("Inserted record {} into {}", id, self.table);
        Ok(id)
    }

    async fn insert_batch(&self, records: &[NewRecord]) -> Result<Vec<i64>> {
        for record in records {
            check_dimension(self.dimension, &record.embedding)?;
        }

        if records.is_empty() {
            return Ok(Vec::new());
        }

        let statement = format!(
            "INSERT INTO {} (content, embedding) VALUES ($1, $2) RETURNING id",
            self.quoted_table()
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| classify(e, "begin transaction"))?;

        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            let id: i64 = sqlx::query_scalar(&statement)
                .bind(&record.content)
                .bind(to_vector(&record.embedding))
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| classify(e, "insert record"))?;
            ids.push(id);
        }

        tx.commit()
            .await
            .map_err(|e| classify(e, "commit records"))?;

        info!("Inserted {} records into {}", ids.len(), self.table);
        Ok(ids)
    }

    async fn nearest_neighbors(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        check_top_k(k)?;
        check_dimension(self.dimension, query)?;

        let statement = format!(
            "SELECT id, content, (embedding <-> $1)::float8 AS distance \
             FROM {} ORDER BY embedding <-> $1 LIMIT $2",
            self.quoted_table()
        );

        let limit = i64::try_from(k)
            .map_err(|_| IndexError::Config(format!("top_k {} is too large", k)))?;

        let results: Vec<SearchResult> = sqlx::query_as(&statement)
            .bind(to_vector(query))
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify(e, "search records"))?;

        debug!("Search in {} returned {} results", self.table, results.len());
        Ok(results)
    }

    async fn count(&self) -> Result<u64> {
        let statement = format!("SELECT count(*) FROM {}", self.quoted_table());

        let count: i64 = sqlx::query_scalar(&statement)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(e, "count records"))?;

        Ok(count.unsigned_abs())
    }

    async fn close(&self) {
        debug!("Closing connection to {}", self.location);
        self.pool.close().await;
    }
}

/// Typed pgvector bind value for `embedding`
#[inline]
pub fn to_vector(embedding: &[f32]) -> Vector {
    Vector::from(embedding.to_vec())
}

/// Double-quote an identifier that already passed [`is_valid_table_name`]
#[inline]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Map a driver error onto the crate's error kinds
#[inline]
pub fn classify(error: sqlx::Error, action: &str) -> IndexError {
    match &error {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => {
            IndexError::Connectivity(format!("Failed to {}: {}", action, error))
        }
        sqlx::Error::Database(db_error) => {
            let code = db_error.code();
            match code.as_deref() {
                Some(
                    INVALID_PASSWORD | INVALID_AUTHORIZATION | INVALID_CATALOG_NAME
                    | CANNOT_CONNECT_NOW,
                ) => IndexError::Connectivity(format!("Failed to {}: {}", action, error)),
                Some(UNDEFINED_TABLE | UNDEFINED_OBJECT | FEATURE_NOT_SUPPORTED) => {
                    IndexError::Schema(format!("Failed to {}: {}", action, error))
                }
                _ if is_dimension_error(db_error.message()) => {
                    IndexError::Schema(format!("Failed to {}: {}", action, error))
                }
                _ => IndexError::Database(format!("Failed to {}: {}", action, error)),
            }
        }
        _ => IndexError::Database(format!("Failed to {}: {}", action, error)),
    }
}

/// pgvector reports width mismatches as "expected N dimensions, not M"
fn is_dimension_error(message: &str) -> bool {
    message.contains("dimensions")
}
