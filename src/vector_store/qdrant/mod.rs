// Qdrant backend over the REST API


use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::QdrantConfig;
use crate::http::{JsonClient, run_blocking};
use crate::vector_store::{ChunkMetadata, DocumentChunk, ScoredChunk, VectorStore, check_lengths};
use crate::{Result, VaultError};

const SERVICE: &str = "qdrant";

#[derive(Debug, Clone)]
pub struct QdrantStore {
    client: JsonClient,
    collection: String,
    scroll_page_size: usize,
}

/// Qdrant wraps every answer in `{"result": ..., "status": ..., "time": ...}`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct ExistsResult {
    exists: bool,
}

/// Flat point payload; `source` carries a keyword index for filtered deletes
#[derive(Debug, Serialize, Deserialize)]
struct ChunkPayload {
    text: String,
    source: String,
    page: u32,
    #[serde(default)]
    chunk_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ingested_at: Option<String>,
}

#[derive(Debug, Serialize)]
struct PointStruct {
    id: String,
    vector: Vec<f32>,
    payload: ChunkPayload,
}

#[derive(Debug, Deserialize)]
struct ScrollResult {
    points: Vec<ScrollPoint>,
    next_page_offset: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ScrollPoint {
    #[serde(default)]
    payload: Option<SourceOnly>,
}

#[derive(Debug, Deserialize)]
struct SourceOnly {
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    score: f32,
    payload: Option<ChunkPayload>,
}

impl QdrantStore {
    #[inline]
    pub fn new(config: &QdrantConfig) -> Result<Self> {
        let client = JsonClient::new(SERVICE, config.qdrant_url()?, config.timeout())
            .with_retry_attempts(config.retry_attempts);

        Ok(Self {
            client,
            collection: config.collection.clone(),
            scroll_page_size: config.scroll_page_size.max(1),
        })
    }

    #[inline]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.client = self.client.with_backoff(backoff);
        self
    }

    #[inline]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn collection_path(&self, suffix: &str) -> String {
        format!("/collections/{}{}", self.collection, suffix)
    }

    #[inline]
    pub fn collection_exists(&self) -> Result<bool> {
        let response: Envelope<ExistsResult> =
            self.client.get_json(&self.collection_path("/exists"))?;
        Ok(response.result.exists)
    }

    /// Create the collection; losing a creation race to another writer is success
    fn create_collection(&self, dimension: usize) -> Result<()> {
        info!(
            "Creating collection {} ({} dimensions, cosine)",
            self.collection, dimension
        );

        let created: Result<Envelope<Value>> = self.client.put_json(
            &self.collection_path(""),
            &json!({ "vectors": { "size": dimension, "distance": "Cosine" } }),
        );
        match created {
            Ok(_) => Ok(()),
            Err(e) if is_already_exists(&e) => {
                debug!("Collection {} was created concurrently", self.collection);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Keyword index on `source`; Qdrant accepts repeated creation with the same schema
    fn ensure_source_index(&self) -> Result<()> {
        let _: Envelope<Value> = self.client.put_json(
            &self.collection_path("/index"),
            &json!({ "field_name": "source", "field_schema": "keyword" }),
        )?;
        Ok(())
    }

    fn ensure_collection_blocking(&self, dimension: usize) -> Result<()> {
        if self.collection_exists()? {
            debug!("Collection {} already exists", self.collection);
        } else {
            self.create_collection(dimension)?;
        }
        self.ensure_source_index()
    }

    fn recreate_collection_blocking(&self, dimension: usize) -> Result<()> {
        if self.collection_exists()? {
            warn!("Dropping collection {}", self.collection);
            let _: Envelope<Value> = self.client.delete_json(&self.collection_path(""))?;
        }
        self.create_collection(dimension)?;
        self.ensure_source_index()
    }

    fn upsert_blocking(&self, chunks: Vec<DocumentChunk>, vectors: Vec<Vec<f32>>) -> Result<usize> {
        check_lengths(&chunks, &vectors)?;
        if chunks.is_empty() {
            return Ok(0);
        }

        let ingested_at = Utc::now().to_rfc3339();
        let points: Vec<PointStruct> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| PointStruct {
                id: Uuid::new_v4().to_string(),
                vector,
                payload: ChunkPayload {
                    text: chunk.text,
                    source: chunk.metadata.source,
                    page: chunk.metadata.page,
                    chunk_index: chunk.metadata.chunk_index,
                    ingested_at: Some(ingested_at.clone()),
                },
            })
            .collect();
        let count = points.len();

        let _: Envelope<Value> = self.client.put_json(
            &self.collection_path("/points?wait=true"),
            &json!({ "points": points }),
        )?;

        debug!("Upserted {} points into {}", count, self.collection);
        Ok(count)
    }

    fn list_sources_blocking(&self) -> Result<Vec<String>> {
        let mut sources: Vec<String> = Vec::new();
        let mut offset: Option<Value> = None;
        let mut pages = 0usize;

        loop {
            let mut request = json!({
                "limit": self.scroll_page_size,
                "with_payload": ["source"],
                "with_vector": false,
            });
            if let Some(next) = offset.take() {
                request["offset"] = next;
            }

            let response: Envelope<ScrollResult> = match self
                .client
                .post_json(&self.collection_path("/points/scroll"), &request)
            {
                Ok(response) => response,
                Err(VaultError::NotFound(_)) => {
                    debug!("Collection {} does not exist yet", self.collection);
                    return Ok(Vec::new());
                }
                Err(e) => return Err(e),
            };
            pages += 1;

            for source in response
                .result
                .points
                .into_iter()
                .filter_map(|point| point.payload.and_then(|p| p.source))
            {
                if !sources.contains(&source) {
                    sources.push(source);
                }
            }

            match response.result.next_page_offset {
                Some(next) if !next.is_null() => offset = Some(next),
                _ => break,
            }
        }

        debug!(
            "Scrolled {} pages of {}, found {} sources",
            pages,
            self.collection,
            sources.len()
        );
        Ok(sources)
    }

    fn delete_source_blocking(&self, source: &str) -> Result<()> {
        let request = json!({
            "filter": { "must": [ { "key": "source", "match": { "value": source } } ] }
        });

        let _: Envelope<Value> = self
            .client
            .post_json(&self.collection_path("/points/delete?wait=true"), &request)
            .map_err(|e| match e {
                VaultError::NotFound(_) => {
                    VaultError::NotFound(format!("collection {} does not exist", self.collection))
                }
                other => other,
            })?;

        info!("Deleted chunks of {} from {}", source, self.collection);
        Ok(())
    }

    fn search_blocking(&self, vector: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
        let request = json!({
            "vector": vector,
            "limit": limit,
            "with_payload": true,
        });

        let response: Envelope<Vec<SearchHit>> = match self
            .client
            .post_json(&self.collection_path("/points/search"), &request)
        {
            Ok(response) => response,
            Err(VaultError::NotFound(_)) => {
                debug!(
                    "Collection {} does not exist, nothing to search",
                    self.collection
                );
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let hits = response
            .result
            .into_iter()
            .filter_map(|hit| {
                let Some(payload) = hit.payload else {
                    warn!("Search hit without payload in {}", self.collection);
                    return None;
                };
                Some(ScoredChunk {
                    chunk: DocumentChunk {
                        text: payload.text,
                        metadata: ChunkMetadata {
                            source: payload.source,
                            page: payload.page,
                            chunk_index: payload.chunk_index,
                        },
                    },
                    score: hit.score,
                })
            })
            .collect();

        Ok(hits)
    }
}

/// Qdrant answers 409, or 400 on older releases, when the collection is already there
fn is_already_exists(error: &VaultError) -> bool {
    match error {
        VaultError::Upstream { message, .. } => {
            message.starts_with("HTTP 409") || message.contains("already exists")
        }
        _ => false,
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, dimension: usize) -> Result<()> {
        let store = self.clone();
        run_blocking(move || store.ensure_collection_blocking(dimension)).await
    }

    async fn recreate_collection(&self, dimension: usize) -> Result<()> {
        let store = self.clone();
        run_blocking(move || store.recreate_collection_blocking(dimension)).await
    }

    async fn add_chunks(
        &self,
        chunks: Vec<DocumentChunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<usize> {
        let store = self.clone();
        run_blocking(move || store.upsert_blocking(chunks, vectors)).await
    }

    async fn list_sources(&self) -> Result<Vec<String>> {
        let store = self.clone();
        run_blocking(move || store.list_sources_blocking()).await
    }

    async fn delete_source(&self, source: &str) -> Result<()> {
        let store = self.clone();
        let source = source.to_string();
        run_blocking(move || store.delete_source_blocking(&source)).await
    }

    async fn search(&self, vector: Vec<f32>, limit: usize) -> Result<Vec<ScoredChunk>> {
        let store = self.clone();
        run_blocking(move || store.search_blocking(&vector, limit)).await
    }
}
