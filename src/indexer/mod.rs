// Indexer module
// Extract, chunk, embed and store documents; embed queries and search


use std::path::Path;

use tracing::{debug, info, warn};

use crate::database::{NewRecord, SearchResult, VectorStore};
use crate::embeddings::chunking::{
    Chunk, ChunkingConfig, RuleBasedSplitter, SentenceSplitter, chunk_with,
};
use crate::embeddings::Embedder;
use crate::extractor::TextSource;
use crate::{IndexError, Result};

/// Number of chunks embedded between progress callbacks
const EMBED_STEP: usize = 8;

/// Outcome of indexing one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    /// Chunks produced and stored, in chunk order
    pub chunks_indexed: usize,
    /// Store-assigned ids of the new records
    pub record_ids: Vec<i64>,
}

/// Runs the indexing and search workflows over an embedder and a store
pub struct Indexer<E, S> {
    embedder: E,
    store: S,
    splitter: Box<dyn SentenceSplitter>,
    chunking: ChunkingConfig,
}

impl<E, S> Indexer<E, S>
where
    E: Embedder,
    S: VectorStore,
{
    #[inline]
    pub fn new(embedder: E, store: S) -> Self {
        Self {
            embedder,
            store,
            splitter: Box::new(RuleBasedSplitter::default()),
            chunking: ChunkingConfig::default(),
        }
    }

    #[inline]
    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Self {
        self.chunking = chunking;
        self
    }

    #[inline]
    pub fn with_splitter(mut self, splitter: Box<dyn SentenceSplitter>) -> Self {
        self.splitter = splitter;
        self
    }

    #[inline]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Check that embedder and store agree on the vector width, then prepare the store
    #[inline]
    pub async fn ensure_schema(&self) -> Result<()> {
        if self.embedder.dimension() != self.store.dimension() {
            return Err(IndexError::Schema(format!(
                "model {} produces {}-dimension vectors but the store expects {}",
                self.embedder.model_name(),
                self.embedder.dimension(),
                self.store.dimension()
            )));
        }

        self.store.ensure_schema().await
    }

    /// Chunk `text` with the configured splitter and window size
    #[inline]
    pub fn chunk(&self, text: &str) -> Result<Vec<Chunk>> {
        chunk_with(
            self.splitter.as_ref(),
            text,
            self.chunking.sentences_per_chunk,
        )
    }

    /// Index a PDF or literal text, returning the number of chunks stored
    #[inline]
    pub async fn index(&self, source: &TextSource) -> Result<usize> {
        let report = self.index_with_progress(source, |_, _| {}).await?;
        Ok(report.chunks_indexed)
    }

    #[inline]
    pub async fn index_pdf(&self, path: &Path) -> Result<usize> {
        self.index(&TextSource::Pdf(path.to_path_buf())).await
    }

    #[inline]
    pub async fn index_text(&self, text: &str) -> Result<usize> {
        self.index(&TextSource::Literal(text.to_string())).await
    }

    /// Index a source, calling `on_progress(embedded, total)` as chunks are embedded.
    ///
    /// Every chunk is embedded before anything is written, and the records are
    /// inserted in chunk order as one batch, so a failure stores nothing.
    #[inline]
    pub async fn index_with_progress<F>(
        &self,
        source: &TextSource,
        mut on_progress: F,
    ) -> Result<IndexReport>
    where
        F: FnMut(usize, usize) + Send,
    {
        let text = read_source(source).await?;
        let chunks = self.chunk(&text)?;

        if chunks.is_empty() {
            warn!("No text to index in {}", source);
            return Ok(IndexReport {
                chunks_indexed: 0,
                record_ids: Vec::new(),
            });
        }

        info!("Indexing {} chunks from {}", chunks.len(), source);

        let contents: Vec<String> = chunks.into_iter().map(|chunk| chunk.content).collect();
        let total = contents.len();
        on_progress(0, total);

        let mut records = Vec::with_capacity(total);
        for step in contents.chunks(EMBED_STEP) {
            let embeddings = self.embedder.embed_batch(step).await?;
            if embeddings.len() != step.len() {
                return Err(IndexError::Embedding(format!(
                    "requested {} embeddings, received {}",
                    step.len(),
                    embeddings.len()
                )));
            }

            records.extend(
                step.iter()
                    .zip(embeddings)
                    .map(|(content, embedding)| NewRecord::new(content.as_str(), embedding)),
            );
            on_progress(records.len(), total);
        }

        let record_ids = self.store.insert_batch(&records).await?;
        debug!("Stored records {:?}", record_ids);

        info!("Indexed {} chunks from {}", record_ids.len(), source);
        Ok(IndexReport {
            chunks_indexed: record_ids.len(),
            record_ids,
        })
    }

    /// Embed and store `text` as a single record without chunking
    #[inline]
    pub async fn insert_document(&self, text: &str) -> Result<i64> {
        let embedding = self.embedder.embed(text).await?;
        let id = self.store.insert(text, &embedding).await?;
        debug!("Inserted document as record {}", id);
        Ok(id)
    }

    /// Texts of the `k` records nearest to `text`, nearest first
    #[inline]
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<String>> {
        let embedding = self.embedder.embed(text).await?;
        self.store.search(&embedding, k).await
    }

    /// Like [`Indexer::query`], keeping ids and distances
    #[inline]
    pub async fn query_with_scores(&self, text: &str, k: usize) -> Result<Vec<SearchResult>> {
        let embedding = self.embedder.embed(text).await?;
        self.store.nearest_neighbors(&embedding, k).await
    }

    /// Release the store session
    #[inline]
    pub async fn close(&self) {
        self.store.close().await;
    }
}

async fn read_source(source: &TextSource) -> Result<String> {
    let source = source.clone();
    tokio::task::spawn_blocking(move || source.read_text())
        .await
        .map_err(|e| IndexError::Extraction(format!("Extraction task failed: {}", e)))?
}
