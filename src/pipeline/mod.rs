// Ingestion and question-answering pipelines over injected services

mod chat;
mod ingest;


use std::sync::Arc;

use tracing::{info, warn};

use crate::Result;
use crate::chat::{ChatModel, OllamaChat};
use crate::chunking::TextSplitter;
use crate::config::Config;
use crate::embeddings::{Embedder, OllamaEmbedder};
use crate::vector_store::{QdrantStore, VectorStore};

pub use chat::{NO_SOURCES_NOTICE, build_context, citation_block, citations, render_prompt};
pub use ingest::upload_source_name;

/// Embedded chunks are written to the store in groups of this size
const UPSERT_BATCH_SIZE: usize = 64;

/// Shared handle over the embedder, vector store and chat model.
///
/// Built once at start-up and shared behind an `Arc`; holds no mutable state.
pub struct VaultService {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    chat: Arc<dyn ChatModel>,
    splitter: TextSplitter,
    top_k: usize,
}

impl VaultService {
    #[inline]
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        chat: Arc<dyn ChatModel>,
        splitter: TextSplitter,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            chat,
            splitter,
            top_k: top_k.max(1),
        }
    }

    /// Connect the Ollama and Qdrant clients described by `config`
    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        let embedder = OllamaEmbedder::new(&config.ollama)?;
        let store = QdrantStore::new(&config.qdrant)?;
        let chat = OllamaChat::new(&config.ollama)?;

        info!(
            "Using Qdrant collection {} at {}, embeddings {} and chat model {} at {}",
            config.qdrant.collection,
            config.qdrant.url,
            config.ollama.embedding_model,
            config.ollama.chat_model,
            config.ollama.url
        );

        Ok(Self::new(
            Arc::new(embedder),
            Arc::new(store),
            Arc::new(chat),
            TextSplitter::new(&config.chunking),
            config.retrieval.top_k,
        ))
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Create the collection if it does not exist yet
    #[inline]
    pub async fn ensure_collection(&self) -> Result<()> {
        self.store
            .ensure_collection(self.embedder.dimension())
            .await
    }

    /// Drop every stored chunk by recreating the collection
    #[inline]
    pub async fn recreate_collection(&self) -> Result<()> {
        warn!("Recreating the vector collection, all stored chunks will be lost");
        self.store
            .recreate_collection(self.embedder.dimension())
            .await
    }

    /// Distinct source filenames in the store.
    ///
    /// Never fails: any store error is logged and reported as an empty list.
    #[inline]
    pub async fn list_documents(&self) -> Vec<String> {
        match self.store.list_sources().await {
            Ok(sources) => sources,
            Err(e) => {
                warn!("Listing documents failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Delete every chunk ingested from `filename`
    #[inline]
    pub async fn delete_document(&self, filename: &str) -> Result<()> {
        self.store.delete_source(filename).await?;
        info!("Deleted document {}", filename);
        Ok(())
    }
}
