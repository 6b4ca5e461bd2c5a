
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{
    NewRecord, SearchResult, VectorStore, check_dimension, check_top_k, euclidean_distance,
};
use crate::{IndexError, Result};

#[derive(Debug, Default)]
struct State {
    schema_ready: bool,
    closed: bool,
    next_id: i64,
    records: Vec<StoredRecord>,
}

#[derive(Debug, Clone)]
struct StoredRecord {
    id: i64,
    content: String,
    embedding: Vec<f32>,
}

/// In-process store with the same contract as the Postgres one.
///
/// Search is a brute-force scan. Records live only as long as the value.
#[derive(Debug)]
pub struct MemoryStore {
    dimension: usize,
    state: RwLock<State>,
}

impl MemoryStore {
    #[inline]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            state: RwLock::new(State::default()),
        }
    }

    fn usable(state: &State) -> Result<()> {
        if state.closed {
            return Err(IndexError::Connectivity(
                "memory store has been closed".to_string(),
            ));
        }
        if !state.schema_ready {
            return Err(IndexError::Schema(
                "record table does not exist; run ensure_schema first".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn ensure_schema(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if state.closed {
            return Err(IndexError::Connectivity(
                "memory store has been closed".to_string(),
            ));
        }
        state.schema_ready = true;
        Ok(())
    }

    async fn insert(&self, content: &str, embedding: &[f32]) -> Result<i64> {
        check_dimension(self.dimension, embedding)?;

        let mut state = self.state.write().await;
        Self::usable(&state)?;

        state.next_id += 1;
        let id = state.next_id;
        state.records.push(StoredRecord {
            id,
            content: content.to_string(),
            embedding: embedding.to_vec(),
        });

        debug!("Stored record {} in memory", id);
        Ok(id)
    }

    async fn insert_batch(&self, records: &[NewRecord]) -> Result<Vec<i64>> {
        for record in records {
            check_dimension(self.dimension, &record.embedding)?;
        }

        let mut state = self.state.write().await;
        Self::usable(&state)?;

        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            state.next_id += 1;
            let id = state.next_id;
            state.records.push(StoredRecord {
                id,
                content: record.content.clone(),
                embedding: record.embedding.clone(),
            });
            ids.push(id);
        }

        debug!("Stored {} records in memory", ids.len());
        Ok(ids)
    }

    async fn nearest_neighbors(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        check_top_k(k)?;
        check_dimension(self.dimension, query)?;

        let state = self.state.read().await;
        Self::usable(&state)?;

        let mut results: Vec<SearchResult> = state
            .records
            .iter()
            .map(|record| SearchResult {
                id: record.id,
                content: record.content.clone(),
                distance: euclidean_distance(&record.embedding, query),
            })
            .collect();

        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        results.truncate(k);

        Ok(results)
    }

    async fn count(&self) -> Result<u64> {
        let state = self.state.read().await;
        Self::usable(&state)?;
        Ok(state.records.len() as u64)
    }

    async fn close(&self) {
        self.state.write().await.closed = true;
    }
}
