// HTTP API: upload, listing, deletion and streamed chat over a shared VaultService


use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::VaultError;
use crate::config::Config;
use crate::embeddings::OllamaEmbedder;
use crate::http::run_blocking;
use crate::pipeline::VaultService;

type AppState = Arc<VaultService>;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadResponse {
    pub status: String,
    pub chunks: usize,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentsResponse {
    pub documents: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

impl VaultError {
    /// HTTP status reported for this error
    #[inline]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Io(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for VaultError {
    #[inline]
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Application router with CORS, request tracing and the upload size limit applied
#[inline]
pub fn router(service: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/documents", get(list_documents))
        .route("/documents/{filename}", delete(delete_document))
        .route("/chat", post(chat))
        .with_state(service)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Build services from `config`, prepare the collection and serve until Ctrl-C
#[inline]
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let service = Arc::new(
        VaultService::from_config(config).context("Failed to initialize services")?,
    );

    // Start even when Qdrant or Ollama is down; requests report the failure themselves
    if let Err(e) = service.ensure_collection().await {
        warn!("Could not prepare the vector collection at startup: {}", e);
    }
    let embedder = OllamaEmbedder::new(&config.ollama)?;
    if let Err(e) = run_blocking(move || embedder.health_check()).await {
        warn!("Embedding model check failed: {}", e);
    }

    let addr: SocketAddr = config
        .server
        .bind_addr()
        .context("Invalid server bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("vault-search listening on http://{}", addr);

    axum::serve(listener, router(service, config.server.max_upload_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn upload(
    State(service): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, VaultError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| VaultError::InvalidInput(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| VaultError::InvalidInput(format!("failed to read upload: {}", e)))?;

        info!("Received upload {} ({} bytes)", filename, bytes.len());
        let chunks = service.ingest_upload(&filename, bytes.to_vec()).await?;

        return Ok(Json(UploadResponse {
            status: "success".to_string(),
            chunks,
        }));
    }

    Err(VaultError::InvalidInput(
        "multipart field \"file\" is required".to_string(),
    ))
}

async fn list_documents(State(service): State<AppState>) -> Json<DocumentsResponse> {
    Json(DocumentsResponse {
        documents: service.list_documents().await,
    })
}

async fn delete_document(
    State(service): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Json<StatusResponse>, VaultError> {
    service.delete_document(&filename).await?;

    Ok(Json(StatusResponse {
        status: "success".to_string(),
        message: format!("Deleted {}", filename),
    }))
}

async fn chat(
    State(service): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, VaultError> {
    let Json(request) = payload.map_err(|e| VaultError::InvalidInput(e.body_text()))?;

    let tokens = service.answer(&request.question).await?;
    let body = Body::from_stream(
        tokens.inspect_err(|e| error!("Chat stream terminated early: {}", e)),
    );

    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response())
}
