use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

use crate::chat::{ChatModel, TokenStream};
use crate::chunking::{ChunkingConfig, TextSplitter};
use crate::embeddings::Embedder;
use crate::pipeline::VaultService;
use crate::vector_store::InMemoryVectorStore;
use crate::{Result, VaultError};

/// Build a PDF with one page per entry in `pages`; an empty entry gives a page without text
pub fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for text in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
        ];
        if !text.is_empty() {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content should encode"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("pdf should serialize");
    bytes
}

pub fn write_pdf(path: &Path, pages: &[&str]) {
    std::fs::write(path, pdf_bytes(pages)).expect("should write pdf");
}

pub fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init()
        .ok();
}

/// Deterministic bag-of-words embedder: texts sharing words get similar vectors
#[derive(Debug, Default)]
pub struct FakeEmbedder {
    pub fail: bool,
}

pub const FAKE_DIMENSION: usize = 64;

#[async_trait]
impl Embedder for FakeEmbedder {
    fn dimension(&self) -> usize {
        FAKE_DIMENSION
    }

    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if self.fail {
            return Err(VaultError::unavailable("ollama", "connection refused"));
        }
        Ok(texts.iter().map(|text| bag_of_words(text)).collect())
    }
}

fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; FAKE_DIMENSION];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let bucket = word
            .to_lowercase()
            .bytes()
            .fold(7usize, |hash, b| hash.wrapping_mul(31).wrapping_add(b as usize));
        vector[bucket % FAKE_DIMENSION] += 1.0;
    }
    vector
}

/// Chat model that replays fixed tokens and records the prompts it was given
#[derive(Debug, Default)]
pub struct ScriptedChat {
    pub tokens: Vec<String>,
    pub fail_midway: bool,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedChat {
    pub fn new(tokens: &[&str]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| (*t).to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().expect("prompt lock").last().cloned()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn stream(&self, prompt: String) -> Result<TokenStream> {
        self.prompts.lock().expect("prompt lock").push(prompt);

        let mut items: Vec<Result<String>> = self.tokens.iter().cloned().map(Ok).collect();
        if self.fail_midway {
            items.push(Err(VaultError::upstream("ollama", "stream interrupted")));
        }
        Ok(stream::iter(items).boxed())
    }
}

/// Service over an in-memory store with a fake embedder and scripted chat model
pub fn service_with(
    store: Arc<InMemoryVectorStore>,
    chat: Arc<ScriptedChat>,
    chunking: &ChunkingConfig,
) -> VaultService {
    VaultService::new(
        Arc::new(FakeEmbedder::default()),
        store,
        chat,
        TextSplitter::new(chunking),
        3,
    )
}
