// Blocking JSON-over-HTTP client shared by the Qdrant and Ollama integrations


use std::io::Read;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};
use url::Url;

use crate::{Result, VaultError};

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u32 = 2;
const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);
const MAX_ERROR_BODY_CHARS: usize = 512;

/// JSON client bound to one upstream service.
///
/// Failures are classified into [`VaultError`] variants: connection problems,
/// timeouts and 5xx/429 answers become `UpstreamUnavailable` and are retried
/// with exponential backoff; 404 becomes `NotFound`; anything else is a
/// non-retryable `Upstream` error.
#[derive(Debug, Clone)]
pub struct JsonClient {
    service: &'static str,
    base_url: Url,
    agent: ureq::Agent,
    retry_attempts: u32,
    backoff: Duration,
}

enum Body<'a> {
    Empty,
    Json(&'a str),
}

impl JsonClient {
    /// Client whose requests must complete within `timeout`
    #[inline]
    pub fn new(service: &'static str, base_url: Url, timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            service,
            base_url,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }

    /// Client for long-lived streaming responses: only connecting is time-limited
    #[inline]
    pub fn streaming(service: &'static str, base_url: Url, connect_timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_connect(Some(connect_timeout))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            service,
            base_url,
            agent,
            retry_attempts: 1,
            backoff: DEFAULT_BACKOFF,
        }
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts.max(1);
        self
    }

    /// Delay before the first retry; later retries double it
    #[inline]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    #[inline]
    pub fn service(&self) -> &'static str {
        self.service
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[inline]
    pub fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    #[inline]
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        join_endpoint(&self.base_url, path).map_err(|e| {
            VaultError::Config(format!(
                "cannot build {} URL for {}: {}",
                self.service, path, e
            ))
        })
    }

    #[inline]
    pub fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        let text = self.execute_with_retry("GET", &url, &Body::Empty)?;
        self.parse(&text, path)
    }

    #[inline]
    pub fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send_json("POST", path, body)
    }

    #[inline]
    pub fn put_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send_json("PUT", path, body)
    }

    #[inline]
    pub fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path)?;
        let text = self.execute_with_retry("DELETE", &url, &Body::Empty)?;
        self.parse(&text, path)
    }

    /// POST `body` and hand back the raw response reader once a 2xx status arrives.
    ///
    /// Never retried: the caller owns the stream and decides when to drop it.
    #[inline]
    pub fn open_stream<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<impl Read + Send + 'static> {
        let url = self.endpoint(path)?;
        let json = self.serialize(body)?;

        debug!("Opening {} stream at {}", self.service, url);

        let mut response = self
            .agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(json.as_str())
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(self.status_error(status, &body));
        }

        Ok(response.into_body().into_reader())
    }

    fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        let json = self.serialize(body)?;
        let text = self.execute_with_retry(method, &url, &Body::Json(&json))?;
        self.parse(&text, path)
    }

    fn serialize<B: Serialize>(&self, body: &B) -> Result<String> {
        serde_json::to_string(body).map_err(|e| {
            VaultError::Other(anyhow::anyhow!(
                "failed to serialize {} request: {}",
                self.service,
                e
            ))
        })
    }

    fn parse<T: DeserializeOwned>(&self, text: &str, path: &str) -> Result<T> {
        serde_json::from_str(text).map_err(|e| {
            VaultError::upstream(
                self.service,
                format!("unexpected response from {}: {}", path, e),
            )
        })
    }

    fn execute_with_retry(&self, method: &str, url: &Url, body: &Body<'_>) -> Result<String> {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!(
                "{} {} {} attempt {}/{}",
                self.service, method, url, attempt, self.retry_attempts
            );

            match self.execute_once(method, url, body) {
                Ok(text) => return Ok(text),
                Err(error) if error.is_retryable() => {
                    warn!(
                        "{} request failed: {}, attempt {}/{}",
                        self.service, error, attempt, self.retry_attempts
                    );
                    last_error = Some(error);

                    if attempt < self.retry_attempts {
                        let delay = self.backoff * EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
                Err(error) => return Err(error),
            }
        }

        error!("All retry attempts failed for {} {}", method, url);

        Err(last_error
            .unwrap_or_else(|| VaultError::unavailable(self.service, "request failed after retries")))
    }

    fn execute_once(&self, method: &str, url: &Url, body: &Body<'_>) -> Result<String> {
        let result = match (method, body) {
            ("GET", _) => self.agent.get(url.as_str()).call(),
            ("DELETE", _) => self.agent.delete(url.as_str()).call(),
            ("PUT", Body::Json(json)) => self
                .agent
                .put(url.as_str())
                .header("Content-Type", "application/json")
                .send(*json),
            (_, Body::Json(json)) => self
                .agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(*json),
            (_, Body::Empty) => self.agent.post(url.as_str()).send_empty(),
        };

        let mut response = result.map_err(|e| self.transport_error(&e))?;
        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| self.transport_error(&e))?;

        if (200..300).contains(&status) {
            Ok(text)
        } else {
            Err(self.status_error(status, &text))
        }
    }

    fn transport_error(&self, error: &ureq::Error) -> VaultError {
        classify_transport_error(self.service, error)
    }

    fn status_error(&self, status: u16, body: &str) -> VaultError {
        classify_status(self.service, status, body)
    }
}

/// Map a transport-level failure (no HTTP status available)
#[inline]
pub fn classify_transport_error(service: &'static str, error: &ureq::Error) -> VaultError {
    match error {
        ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound
        | ureq::Error::Timeout(_)
        | ureq::Error::Io(_) => VaultError::unavailable(service, error.to_string()),
        ureq::Error::StatusCode(status) => classify_status(service, *status, ""),
        _ => VaultError::upstream(service, error.to_string()),
    }
}

/// Map a non-2xx HTTP status and its body
#[inline]
pub fn classify_status(service: &'static str, status: u16, body: &str) -> VaultError {
    let detail: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
    let message = if detail.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, detail)
    };

    match status {
        404 => VaultError::NotFound(format!("{} {}", service, message)),
        429 | 500..=599 => VaultError::unavailable(service, message),
        _ => VaultError::upstream(service, message),
    }
}

/// Resolve `path` below `base`, keeping any path prefix `base` carries
/// (e.g. `http://proxy/qdrant` + `/collections` gives `http://proxy/qdrant/collections`)
#[inline]
pub fn join_endpoint(base: &Url, path: &str) -> std::result::Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let prefix = format!("{}/", base.path());
        base.set_path(&prefix);
    }
    base.join(path.trim_start_matches('/'))
}

/// Run blocking client work on tokio's blocking pool
pub async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| VaultError::Other(anyhow::anyhow!("blocking task failed: {}", e)))?
}
