// Database module
// Record storage and nearest-neighbour search over chunk embeddings

pub mod memory;
pub mod postgres;


use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::{IndexError, Result};

pub use memory::MemoryStore;
pub use postgres::PgVectorStore;

/// One hit from a nearest-neighbour search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SearchResult {
    pub id: i64,
    pub content: String,
    /// Euclidean distance between the stored and the query vector
    pub distance: f64,
}

/// A record waiting to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub content: String,
    pub embedding: Vec<f32>,
}

impl NewRecord {
    #[inline]
    pub fn new(content: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            content: content.into(),
            embedding,
        }
    }
}

/// Append-only store of (id, content, embedding) records.
///
/// Identifiers are assigned by the store and never reused. Every stored
/// embedding has exactly [`VectorStore::dimension`] components.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Width of the embedding column
    fn dimension(&self) -> usize;

    /// Create whatever the store needs; calling it again changes nothing
    async fn ensure_schema(&self) -> Result<()>;

    async fn insert(&self, content: &str, embedding: &[f32]) -> Result<i64>;

    /// Insert all records or none of them, returning ids in input order
    async fn insert_batch(&self, records: &[NewRecord]) -> Result<Vec<i64>>;

    /// Up to `k` records ordered by ascending Euclidean distance to `query`
    async fn nearest_neighbors(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    /// Content of the `k` nearest records, nearest first
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<String>> {
        Ok(self
            .nearest_neighbors(query, k)
            .await?
            .into_iter()
            .map(|result| result.content)
            .collect())
    }

    async fn count(&self) -> Result<u64>;

    /// Release the underlying session
    async fn close(&self);
}

/// Reject vectors whose width differs from the store's
#[inline]
pub fn check_dimension(expected: usize, embedding: &[f32]) -> Result<()> {
    if embedding.len() == expected {
        Ok(())
    } else {
        Err(IndexError::Schema(format!(
            "expected {} dimensions, got {}",
            expected,
            embedding.len()
        )))
    }
}

#[inline]
pub fn check_top_k(k: usize) -> Result<()> {
    if k == 0 {
        Err(IndexError::Config("top_k must be at least 1".to_string()))
    } else {
        Ok(())
    }
}

/// Euclidean (L2) distance, the metric behind pgvector's `<->`
#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = f64::from(*x) - f64::from(*y);
            diff * diff
        })
        .sum::<f64>()
        .sqrt()
}
