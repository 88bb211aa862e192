// Vector store module
// Persists embedded chunks and answers similarity queries

pub mod memory;
pub mod qdrant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

pub use memory::InMemoryVectorStore;
pub use qdrant::QdrantStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Filename the chunk was ingested from
    pub source: String,
    /// 0-based page index within the source
    pub page: u32,
    /// Position of the chunk within its page
    pub chunk_index: u32,
}

impl ChunkMetadata {
    /// Citation label, e.g. `policy.pdf (Page 0)` for the first page
    #[inline]
    pub fn citation(&self) -> String {
        format!("{} (Page {})", self.source, self.page)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A retrieved chunk with its similarity to the query (higher is closer)
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Storage for embedded chunks.
///
/// A store manages a single collection. Reads against a collection that does
/// not exist yet behave as if it were empty; deleting from a missing
/// collection is `NotFound`.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection with `dimension`-length cosine vectors unless it already exists
    async fn ensure_collection(&self, dimension: usize) -> Result<()>;

    /// Drop the collection if present and create it empty
    async fn recreate_collection(&self, dimension: usize) -> Result<()>;

    /// Store `chunks[i]` with `vectors[i]`; returns the number of points written
    async fn add_chunks(&self, chunks: Vec<DocumentChunk>, vectors: Vec<Vec<f32>>)
    -> Result<usize>;

    /// Distinct chunk sources in first-seen order
    async fn list_sources(&self) -> Result<Vec<String>>;

    /// Remove every chunk whose source equals `source` exactly
    async fn delete_source(&self, source: &str) -> Result<()>;

    /// Up to `limit` chunks ordered by descending similarity to `vector`
    async fn search(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<ScoredChunk>>;
}

/// Check that chunks and vectors pair up one to one
#[inline]
pub fn check_lengths(chunks: &[DocumentChunk], vectors: &[Vec<f32>]) -> Result<()> {
    if chunks.len() == vectors.len() {
        Ok(())
    } else {
        Err(crate::VaultError::InvalidInput(format!(
            "{} chunks but {} vectors",
            chunks.len(),
            vectors.len()
        )))
    }
}
