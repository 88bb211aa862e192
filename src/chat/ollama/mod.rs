
use std::io::{BufRead, BufReader};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::chat::{ChatModel, TokenStream, receiver_stream};
use crate::config::OllamaConfig;
use crate::http::JsonClient;
use crate::{Result, VaultError};

const SERVICE: &str = "ollama";
const CHANNEL_CAPACITY: usize = 64;

/// Streaming client for Ollama's `/api/chat`
#[derive(Debug, Clone)]
pub struct OllamaChat {
    client: JsonClient,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// One NDJSON line of a streamed chat response
#[derive(Debug, Deserialize)]
struct ChatChunk {
    message: Option<ChatMessage>,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

/// How a token pump finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpOutcome {
    /// The model reported `done`
    Completed,
    /// The response ended without a `done` marker; an error was forwarded
    Truncated,
    /// An error was forwarded to the consumer
    Failed,
    /// The consumer dropped its receiver
    Disconnected,
}

impl OllamaChat {
    #[inline]
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let client = JsonClient::streaming(SERVICE, config.ollama_url()?, config.timeout());

        Ok(Self {
            client,
            model: config.chat_model.clone(),
        })
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, prompt: String) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            stream: true,
        }
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    async fn stream(&self, prompt: String) -> Result<TokenStream> {
        let (token_tx, token_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (opened_tx, opened_rx) = oneshot::channel();
        let client = self.client.clone();
        let request = self.request(prompt);

        debug!("Starting chat completion with {}", self.model);

        tokio::task::spawn_blocking(move || {
            let reader = match client.open_stream("/api/chat", &request) {
                Ok(reader) => reader,
                Err(e) => {
                    if opened_tx.send(Err(e)).is_err() {
                        debug!("Chat caller went away before the stream opened");
                    }
                    return;
                }
            };
            if opened_tx.send(Ok(())).is_err() {
                debug!("Chat caller went away before the stream opened");
                return;
            }

            let outcome = pump_tokens(BufReader::new(reader), &token_tx);
            info!("Chat stream for {} finished: {:?}", request.model, outcome);
        });

        opened_rx.await.map_err(|_| {
            VaultError::Other(anyhow::anyhow!(
                "chat worker exited before opening the stream"
            ))
        })??;

        Ok(receiver_stream(token_rx))
    }
}

/// Forward the content of each NDJSON line in `reader` to `sender`.
///
/// Stops at the `done` marker, at the first error (which is forwarded), at the
/// end of input without `done` (forwarded as an error), or as soon as a send fails because the receiver was dropped. Returning drops the
/// reader and with it the upstream connection.
pub fn pump_tokens<R: BufRead>(reader: R, sender: &mpsc::Sender<Result<String>>) -> PumpOutcome {
    let forward_error = |error: VaultError| {
        if sender.blocking_send(Err(error)).is_err() {
            PumpOutcome::Disconnected
        } else {
            PumpOutcome::Failed
        }
    };

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Chat stream read failed: {}", e);
                return forward_error(VaultError::unavailable(SERVICE, e.to_string()));
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let chunk: ChatChunk = match serde_json::from_str(&line) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Malformed chat stream line: {}", e);
                return forward_error(VaultError::upstream(
                    SERVICE,
                    format!("malformed stream line: {}", e),
                ));
            }
        };

        if let Some(message) = chunk.error {
            warn!("Chat model reported an error: {}", message);
            return forward_error(VaultError::upstream(SERVICE, message));
        }

        if let Some(message) = chunk.message {
            if !message.content.is_empty() && sender.blocking_send(Ok(message.content)).is_err() {
                debug!("Chat consumer disconnected, stopping generation");
                return PumpOutcome::Disconnected;
            }
        }

        if chunk.done {
            return PumpOutcome::Completed;
        }
    }

    warn!("Chat stream ended without a done marker");
    let truncated = VaultError::unavailable(SERVICE, "stream ended without done marker");
    if sender.blocking_send(Err(truncated)).is_err() {
        return PumpOutcome::Disconnected;
    }
    PumpOutcome::Truncated
}
