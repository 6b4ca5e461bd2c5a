// Embeddings module
// Sentence chunking and the embedding capability consumed by the indexer

pub mod chunking;
pub mod ollama;

use async_trait::async_trait;

use crate::Result;

pub use chunking::{
    Chunk, ChunkingConfig, RuleBasedSplitter, SentenceSplitter, chunk_text, chunk_with,
};
pub use ollama::OllamaClient;

/// Turns text into a fixed-dimension vector.
///
/// Implementations must be deterministic for a fixed model and always return
/// vectors of [`Embedder::dimension`] length.
#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, returning vectors in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}
