//! JSON HTTP API for uploading files and asking questions.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/prompts` | Registered prompt templates |
//! | `POST` | `/ingest?name=<file name>` | Raw upload body (PDF or text); returns the chunk count |
//! | `POST` | `/ask` | `{ "question": "…", "k": 4, "prompt": "default" }` → answer + sources |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "not found: local index at …" } }
//! ```
//!
//! | Code | Status |
//! |------|--------|
//! | `bad_request`, `unknown_prompt`, `configuration`, `unsupported_provider` | 400 |
//! | `not_found` | 404 |
//! | `unsupported_file_type` | 415 |
//! | `extraction_failed` | 422 |
//! | `dependency_unavailable`, `internal` | 500 |
//! | `provider_error` | 502 |
//! | `backend_unavailable` | 503 |
//!
//! Uploads larger than `server.max_upload_bytes` are rejected with 413.

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ragfile_core::models::AnswerRecord;
use ragfile_core::prompt::prompts;
use ragfile_core::RagError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::Config;

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
}

/// Build the router over a resolved configuration.
pub fn router(config: Arc<Config>) -> Router {
    let limit = config.server.max_upload_bytes;
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/prompts", get(handle_prompts))
        .route("/ingest", post(handle_ingest))
        .route("/ask", post(handle_ask))
        .layer(DefaultBodyLimit::max(limit))
        .layer(cors)
        .with_state(AppState { config })
}

/// Serve the API on `server.bind` until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(Arc::new(config.clone()));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        let (status, code) = match &err {
            RagError::UnknownPrompt { .. } => (StatusCode::BAD_REQUEST, "unknown_prompt"),
            RagError::Configuration(_) => (StatusCode::BAD_REQUEST, "configuration"),
            RagError::UnsupportedProvider(_) => (StatusCode::BAD_REQUEST, "unsupported_provider"),
            RagError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            RagError::UnsupportedFileType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_file_type")
            }
            RagError::Extraction(_) => (StatusCode::UNPROCESSABLE_ENTITY, "extraction_failed"),
            RagError::DependencyUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "dependency_unavailable")
            }
            RagError::Provider(_) => (StatusCode::BAD_GATEWAY, "provider_error"),
            RagError::BackendUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "backend_unavailable")
            }
            RagError::CorruptIndex(_) | RagError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };
        if status.is_server_error() {
            warn!(code, error = %err, "request failed");
        }
        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /prompts ============

#[derive(Serialize)]
struct PromptInfo {
    name: &'static str,
    description: &'static str,
}

#[derive(Serialize)]
struct PromptListResponse {
    prompts: Vec<PromptInfo>,
}

async fn handle_prompts() -> Json<PromptListResponse> {
    Json(PromptListResponse {
        prompts: prompts()
            .iter()
            .map(|p| PromptInfo {
                name: p.name,
                description: p.description,
            })
            .collect(),
    })
}

// ============ POST /ingest ============

#[derive(Deserialize)]
struct IngestParams {
    name: Option<String>,
}

#[derive(Serialize)]
struct IngestResponse {
    source: String,
    chunks: usize,
}

async fn handle_ingest(
    State(state): State<AppState>,
    Query(params): Query<IngestParams>,
    body: Bytes,
) -> Result<Json<IngestResponse>, AppError> {
    let name = params
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| bad_request("query parameter 'name' is required"))?;

    let chunks = crate::ingest::ingest_bytes(&state.config, &name, &body).await?;
    info!(source = %name, chunks, "ingested upload");
    Ok(Json(IngestResponse {
        source: name,
        chunks,
    }))
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    k: Option<usize>,
    prompt: Option<String>,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AnswerRecord>, AppError> {
    if req.question.trim().is_empty() {
        return Err(bad_request("question must not be empty"));
    }
    let k = req.k.unwrap_or(state.config.retrieval.k);
    if k == 0 {
        return Err(bad_request("k must be >= 1"));
    }
    let prompt = req
        .prompt
        .unwrap_or_else(|| state.config.retrieval.prompt.clone());

    let record = crate::answer::answer(&state.config, &req.question, k, &prompt).await?;
    Ok(Json(record))
}
