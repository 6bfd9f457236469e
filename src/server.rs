//! JSON HTTP API.
//!
//! Thin plumbing over the core pipeline, suitable for a browser client.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/documents` | Upload a document (base64 bytes + format hint) |
//! | `GET`  | `/documents` | List document summaries |
//! | `POST` | `/documents/{id}/ask` | Ask a question against a document |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Every failure maps to a structured response:
//!
//! ```json
//! { "error": { "code": "not_found", "message": "document not found: ..." } }
//! ```
//!
//! Codes come from [`QaError::code`]: `unsupported_format`,
//! `empty_question`, `duplicate_id` (400), `not_found` (404),
//! `unrecognized_response_shape`, `external_capability` (502),
//! `persistence` (500), plus `bad_request` and `internal`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support
//! browser-based clients.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::answer::{Answerer, AnswerOutcome};
use crate::config::Config;
use crate::embedding::EmbeddingGateway;
use crate::error::QaError;
use crate::ingest::{self, UploadReceipt};
use crate::models::DocumentSummary;
use crate::provider::{HttpEmbedder, HttpGenerator};
use crate::store::DocumentStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    store: Arc<DocumentStore>,
    gateway: Arc<EmbeddingGateway>,
    answerer: Arc<Answerer>,
}

/// Start the HTTP server on the configured bind address.
///
/// Opens the document store, wires the HTTP-backed providers, and serves
/// until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = Arc::new(DocumentStore::open_file(&config.storage.path)?);
    let gateway = Arc::new(EmbeddingGateway::new(Box::new(HttpEmbedder::new(
        &config.embedding,
    )?)));
    let generator = Box::new(HttpGenerator::new(&config.generation)?);
    let answerer = Arc::new(Answerer::new(
        store.clone(),
        gateway.clone(),
        generator,
        &config.retrieval,
    ));

    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        gateway,
        answerer,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/documents", post(handle_upload).get(handle_list))
        .route("/documents/{id}/ask", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    let bind = config.server.bind.clone();
    tracing::info!("listening on http://{}", bind);

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<&QaError> for AppError {
    fn from(err: &QaError) -> Self {
        let status = match err {
            QaError::NotFound(_) => StatusCode::NOT_FOUND,
            QaError::EmptyQuestion
            | QaError::DuplicateId(_)
            | QaError::UnsupportedFormat(_) => StatusCode::BAD_REQUEST,
            QaError::UnrecognizedResponseShape { .. } | QaError::ExternalCapability(_) => {
                StatusCode::BAD_GATEWAY
            }
            QaError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<QaError> for AppError {
    fn from(err: QaError) -> Self {
        AppError::from(&err)
    }
}

/// Map pipeline errors: known kinds keep their code and status, anything
/// else becomes a 500.
fn classify_pipeline_error(err: anyhow::Error) -> AppError {
    if let Some(qa) = err.downcast_ref::<QaError>() {
        return AppError::from(qa);
    }
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: err.to_string(),
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

// ============ POST /documents ============

/// Upload request: raw file bytes travel base64-encoded in JSON.
#[derive(Deserialize)]
struct UploadRequest {
    filename: String,
    /// Format hint: extension (`pdf`, `docx`, `txt`, `md`) or MIME type.
    format: String,
    data_base64: String,
}

async fn handle_upload(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> Result<Json<UploadReceipt>, AppError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&req.data_base64)
        .map_err(|e| bad_request(format!("invalid base64 payload: {}", e)))?;

    let receipt = ingest::ingest_document(
        &state.store,
        &state.gateway,
        &state.config.chunking,
        &req.filename,
        &bytes,
        &req.format,
    )
    .await
    .map_err(classify_pipeline_error)?;

    Ok(Json(receipt))
}

// ============ GET /documents ============

#[derive(Serialize)]
struct ListResponse {
    documents: Vec<DocumentSummary>,
}

async fn handle_list(State(state): State<AppState>) -> Json<ListResponse> {
    Json(ListResponse {
        documents: state.store.list(),
    })
}

// ============ POST /documents/{id}/ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AnswerOutcome>, AppError> {
    let outcome = state.answerer.answer(&id, &req.question).await?;
    Ok(Json(outcome))
}
