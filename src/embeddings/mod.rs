// Embeddings module
// Maps chunk and query text to dense vectors

pub mod ollama;

use async_trait::async_trait;

use crate::Result;

pub use ollama::{ModelInfo, OllamaEmbedder};

/// Text embedding backend.
///
/// Implementations must return exactly one vector per input text, in input
/// order, each of length [`Embedder::dimension`].
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Length of every vector this embedder produces
    fn dimension(&self) -> usize;

    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_documents(vec![text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            crate::VaultError::upstream("embedder", "no embedding returned for query")
        })
    }
}
