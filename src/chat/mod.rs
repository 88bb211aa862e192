// Chat model module
// Streaming completion clients for grounded generation

pub mod ollama;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::mpsc;

use crate::Result;

pub use ollama::OllamaChat;

/// Completion tokens in arrival order. An `Err` item ends the stream.
pub type TokenStream = BoxStream<'static, Result<String>>;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Start generating a completion for `prompt`.
    ///
    /// Errors that happen before the first token (connection refused, unknown
    /// model) are returned directly; later failures arrive as stream items.
    /// Dropping the returned stream cancels generation.
    async fn stream(&self, prompt: String) -> Result<TokenStream>;
}

/// Adapt the receiving half of a token channel into a [`TokenStream`]
#[inline]
pub fn receiver_stream(receiver: mpsc::Receiver<Result<String>>) -> TokenStream {
    stream::unfold(receiver, |mut receiver| async move {
        receiver.recv().await.map(|item| (item, receiver))
    })
    .boxed()
}
