#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Integration tests that require local Qdrant and Ollama instances
// Run with: cargo test --test integration_services -- --ignored

use std::env;

use futures::StreamExt;
use tracing::info;
use vault_search::config::{Config, OllamaConfig, QdrantConfig};
use vault_search::embeddings::{Embedder, OllamaEmbedder};
use vault_search::loader::Page;
use vault_search::pipeline::VaultService;
use vault_search::vector_store::{QdrantStore, VectorStore};

const TEST_COLLECTION: &str = "vault_search_integration";

fn integration_config() -> Config {
    let mut config = Config {
        qdrant: QdrantConfig {
            collection: env::var("VAULT_SEARCH_TEST_COLLECTION")
                .unwrap_or_else(|_| TEST_COLLECTION.to_string()),
            ..QdrantConfig::default()
        },
        ollama: OllamaConfig {
            batch_size: 4,
            timeout_secs: 120,
            ..OllamaConfig::default()
        },
        ..Config::default()
    };
    config.apply_env_overrides();
    config
}

fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok();
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a running Ollama with the all-minilm model"]
async fn real_ollama_embeddings_have_expected_dimension() {
    init_test_tracing();
    let config = integration_config();
    let embedder = OllamaEmbedder::new(&config.ollama).expect("Failed to create embedder");

    let vectors = embedder
        .embed_documents(vec![
            "Records are retained for seven years.".to_string(),
            "Audits happen annually.".to_string(),
        ])
        .await
        .expect("embedding should succeed");

    assert_eq!(vectors.len(), 2);
    assert!(vectors.iter().all(|v| v.len() == embedder.dimension()));
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires a running Qdrant"]
async fn real_qdrant_collection_lifecycle() {
    init_test_tracing();
    let config = integration_config();
    let store = QdrantStore::new(&config.qdrant).expect("Failed to create store");

    store
        .recreate_collection(4)
        .await
        .expect("collection should be recreated");
    assert!(store.list_sources().await.expect("list").is_empty());

    let hits = store
        .search(vec![1.0, 0.0, 0.0, 0.0], 3)
        .await
        .expect("search of empty collection");
    assert!(hits.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "requires running Qdrant and Ollama"]
async fn real_ingest_ask_delete_round_trip() {
    init_test_tracing();
    let config = integration_config();
    let service = VaultService::from_config(&config).expect("Failed to create service");
    service
        .recreate_collection()
        .await
        .expect("collection should be recreated");

    let pages = vec![Page {
        number: 0,
        text: "Transfer records must be retained for seven years by every operator.".to_string(),
    }];
    let stored = service
        .ingest_pages(&pages, "retention.pdf")
        .await
        .expect("ingest should succeed");
    assert!(stored >= 1);
    assert_eq!(service.list_documents().await, vec!["retention.pdf"]);

    let answer: String = service
        .answer("How long must transfer records be retained?")
        .await
        .expect("answer should start")
        .map(|token| token.expect("token"))
        .collect::<Vec<_>>()
        .await
        .concat();
    info!("Answer: {}", answer);
    assert!(answer.contains("retention.pdf (Page 0)"));

    service
        .delete_document("retention.pdf")
        .await
        .expect("delete should succeed");
    assert!(service.list_documents().await.is_empty());
}
