
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::OllamaConfig;
use crate::embeddings::Embedder;
use crate::http::{JsonClient, run_blocking};
use crate::{Result, VaultError};

/// all-MiniLM-L6-v2 vector length
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 384;

const SERVICE: &str = "ollama";

/// Embedder backed by a local Ollama server's `/api/embed` endpoint
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    client: JsonClient,
    model: String,
    batch_size: usize,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    model: &'a str,
    #[serde(rename = "input")]
    inputs: &'a [String],
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaEmbedder {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let base_url = config.ollama_url()?;
        let client = JsonClient::new(SERVICE, base_url, config.timeout())
            .with_retry_attempts(config.retry_attempts);

        Ok(Self {
            client,
            model: config.embedding_model.clone(),
            batch_size: config.batch_size.max(1) as usize,
            dimension: config.embedding_dimension as usize,
        })
    }

    #[inline]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.client = self.client.with_backoff(backoff);
        self
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Verify the server answers and the embedding model is installed
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!(
            "Performing health check for Ollama at {}",
            self.client.base_url()
        );

        let models = self.list_models()?;
        if !models.iter().any(|m| model_matches(&m.name, &self.model)) {
            let available: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
            return Err(VaultError::NotFound(format!(
                "embedding model '{}' is not installed (available: {})",
                self.model,
                available.join(", ")
            )));
        }

        info!(
            "Health check passed for Ollama server at {} with model {}",
            self.client.base_url(),
            self.model
        );
        Ok(())
    }

    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response: ModelsResponse = self.client.get_json("/api/tags")?;
        Ok(response.models)
    }

    /// Embed `texts` in batches of `batch_size`, blocking the current thread
    #[inline]
    pub fn embed_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());

        for (batch_index, batch) in texts.chunks(self.batch_size).enumerate() {
            debug!(
                "Embedding batch {} ({} texts) with {}",
                batch_index + 1,
                batch.len(),
                self.model
            );
            vectors.extend(self.embed_batch(batch)?);
        }

        Ok(vectors)
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = BatchEmbedRequest {
            model: &self.model,
            inputs: texts,
        };
        let response: BatchEmbedResponse = self.client.post_json("/api/embed", &request)?;

        if response.embeddings.len() != texts.len() {
            return Err(VaultError::upstream(
                SERVICE,
                format!(
                    "Mismatch between request and response counts: {} vs {}",
                    texts.len(),
                    response.embeddings.len()
                ),
            ));
        }

        if let Some(bad) = response
            .embeddings
            .iter()
            .find(|embedding| embedding.len() != self.dimension)
        {
            return Err(VaultError::upstream(
                SERVICE,
                format!(
                    "model {} returned {}-dimensional embeddings, expected {}",
                    self.model,
                    bad.len(),
                    self.dimension
                ),
            ));
        }

        Ok(response.embeddings)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let embedder = self.clone();
        run_blocking(move || embedder.embed_blocking(&texts)).await
    }
}

/// Ollama reports installed models with a tag, e.g. `all-minilm:latest`
fn model_matches(installed: &str, wanted: &str) -> bool {
    installed == wanted
        || installed
            .split_once(':')
            .is_some_and(|(name, tag)| name == wanted && tag == "latest")
}
