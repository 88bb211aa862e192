use futures::StreamExt;
use futures::{future, stream};
use itertools::Itertools;
use tracing::{debug, info};

use crate::chat::TokenStream;
use crate::pipeline::VaultService;
use crate::vector_store::ScoredChunk;
use crate::{Result, VaultError};

/// Appended instead of a citation list when retrieval found nothing
pub const NO_SOURCES_NOTICE: &str = "\n\n(No specific documents found)";

const CITATION_HEADER: &str = "\n\n---\n**📚 Verified Sources:**\n";

/// Grounding prompt: answer only from `context`, admit ignorance otherwise
#[inline]
pub fn render_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a strict compliance assistant.\n\
         Answer based ONLY on the following context.\n\
         If unknown, say \"I don't know.\"\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {question}\n"
    )
}

/// Retrieved chunk texts separated by blank lines, in rank order
#[inline]
pub fn build_context(hits: &[ScoredChunk]) -> String {
    hits.iter().map(|hit| hit.chunk.text.as_str()).join("\n\n")
}

/// `source (Page n)` labels in rank order, first occurrence kept
#[inline]
pub fn citations(hits: &[ScoredChunk]) -> Vec<String> {
    hits.iter()
        .map(|hit| hit.chunk.metadata.citation())
        .unique()
        .collect()
}

#[inline]
pub fn citation_block(citations: &[String]) -> String {
    if citations.is_empty() {
        return NO_SOURCES_NOTICE.to_string();
    }

    let mut block = String::from(CITATION_HEADER);
    for citation in citations {
        block.push_str("- 📄 ");
        block.push_str(citation);
        block.push('\n');
    }
    block
}

impl VaultService {
    /// Top-k chunks most similar to `question`
    #[inline]
    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredChunk>> {
        let vector = self.embedder.embed_query(question).await?;
        let hits = self.store.search(vector, self.top_k).await?;
        debug!("Retrieved {} chunks for question", hits.len());
        Ok(hits)
    }

    /// Answer `question` from retrieved context.
    ///
    /// The stream yields model tokens as they arrive, then the citation block.
    /// Retrieval and model start-up failures are returned before any token. A
    /// model failure mid-stream is the last item; no citations follow it.
    #[inline]
    pub async fn answer(&self, question: &str) -> Result<TokenStream> {
        let question = question.trim();
        if question.is_empty() {
            return Err(VaultError::InvalidInput(
                "question cannot be empty".to_string(),
            ));
        }

        let hits = self.retrieve(question).await?;
        let prompt = render_prompt(&build_context(&hits), question);
        let sources = citations(&hits);
        info!(
            "Answering with {} retrieved chunks from {} sources",
            hits.len(),
            sources.len()
        );

        let tokens = self.chat.stream(prompt).await?;
        let footer = citation_block(&sources);

        Ok(tokens
            .chain(stream::once(async move { Ok(footer) }))
            .scan(false, |failed, item| {
                if *failed {
                    return future::ready(None);
                }
                *failed = item.is_err();
                future::ready(Some(item))
            })
            .boxed())
    }
}
