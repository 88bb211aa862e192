// In-process vector store, used for tests and local experiments

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::vector_store::{DocumentChunk, ScoredChunk, VectorStore, check_lengths};
use crate::{Result, VaultError};

#[derive(Debug)]
struct Collection {
    dimension: usize,
    points: Vec<(DocumentChunk, Vec<f32>)>,
}

/// Brute-force cosine search over a single in-memory collection
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    collection: RwLock<Option<Collection>>,
}

impl InMemoryVectorStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chunks, or `None` when the collection does not exist
    #[inline]
    pub async fn len(&self) -> Option<usize> {
        self.collection.read().await.as_ref().map(|c| c.points.len())
    }

    #[inline]
    pub async fn is_empty(&self) -> bool {
        self.len().await.unwrap_or(0) == 0
    }

    /// Every stored chunk in insertion order
    #[inline]
    pub async fn chunks(&self) -> Vec<DocumentChunk> {
        self.collection
            .read()
            .await
            .as_ref()
            .map(|c| c.points.iter().map(|(chunk, _)| chunk.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let mut guard = self.collection.write().await;
        if guard.is_none() {
            *guard = Some(Collection {
                dimension,
                points: Vec::new(),
            });
        }
        Ok(())
    }

    async fn recreate_collection(&self, dimension: usize) -> Result<()> {
        *self.collection.write().await = Some(Collection {
            dimension,
            points: Vec::new(),
        });
        Ok(())
    }

    async fn add_chunks(
        &self,
        chunks: Vec<DocumentChunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<usize> {
        check_lengths(&chunks, &vectors)?;

        let mut guard = self.collection.write().await;
        let collection = guard
            .as_mut()
            .ok_or_else(|| VaultError::NotFound("collection does not exist".to_string()))?;

        if let Some(bad) = vectors.iter().find(|v| v.len() != collection.dimension) {
            return Err(VaultError::InvalidInput(format!(
                "vector has {} dimensions, collection expects {}",
                bad.len(),
                collection.dimension
            )));
        }

        let count = chunks.len();
        collection.points.extend(chunks.into_iter().zip(vectors));
        Ok(count)
    }

    async fn list_sources(&self) -> Result<Vec<String>> {
        let guard = self.collection.read().await;
        let mut sources: Vec<String> = Vec::new();
        for (chunk, _) in guard.iter().flat_map(|c| c.points.iter()) {
            if !sources.contains(&chunk.metadata.source) {
                sources.push(chunk.metadata.source.clone());
            }
        }
        Ok(sources)
    }

    async fn delete_source(&self, source: &str) -> Result<()> {
        let mut guard = self.collection.write().await;
        let collection = guard
            .as_mut()
            .ok_or_else(|| VaultError::NotFound("collection does not exist".to_string()))?;
        collection
            .points
            .retain(|(chunk, _)| chunk.metadata.source != source);
        Ok(())
    }

    async fn search(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<ScoredChunk>> {
        let guard = self.collection.read().await;
        let Some(collection) = guard.as_ref() else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<ScoredChunk> = collection
            .points
            .iter()
            .map(|(chunk, stored)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(&vector, stored),
            })
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(limit);
        Ok(scored)
    }
}

/// Cosine similarity; zero vectors score 0
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
