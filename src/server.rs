//! HTTP API for the conversation pipeline.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/conversations` | Process `{ "text", "title"? }` as a new conversation |
//! | `POST` | `/conversations/` | Same as above, for clients that post with a trailing slash |
//! | `GET`  | `/conversations/{id}/segments` | Ordered segments with labels |
//! | `GET`  | `/conversations/{id}/annotations` | Annotations grouped by segment id |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "text must contain at least one non-empty segment" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use choff_core::models::ProcessResult;
use choff_core::pipeline::Pipeline;
use choff_core::Error;

use crate::config::Config;
use crate::get::{get_annotations, get_segments, AnnotationResponse, SegmentResponse};
use crate::ingest::build_pipeline;
use crate::sqlite_store::SqliteStore;
use crate::{db, migrate};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

/// Build the router with all routes and the CORS layer.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/conversations", post(handle_create_conversation))
        .route("/conversations/", post(handle_create_conversation))
        .route("/conversations/{id}/segments", get(handle_segments))
        .route("/conversations/{id}/annotations", get(handle_annotations))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Serve on an already-bound listener until the process is terminated.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Starts the HTTP server on `[server].bind`.
///
/// Connects to the configured database, ensures the schema exists, and
/// builds one [`Pipeline`] shared by every request.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply_schema(&pool).await?;
    let pipeline = build_pipeline(config, Arc::new(SqliteStore::new(pool)))?;

    let listener = TcpListener::bind(&config.server.bind).await?;
    info!(bind = %config.server.bind, "HTTP server listening");
    serve(listener, AppState::new(pipeline)).await
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
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

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Map pipeline and store failures onto HTTP statuses by recovering the
/// typed [`Error`] from the `anyhow` chain.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<Error>() {
            Some(Error::InvalidInput(msg)) => bad_request(msg.clone()),
            Some(e @ Error::NotFound { .. }) => not_found(e.to_string()),
            _ => {
                error!(error = %err, "request failed");
                internal(err.to_string())
            }
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    /// Always `"healthy"` when the server is running.
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /conversations ============

#[derive(Deserialize)]
struct ConversationRequest {
    text: String,
    #[serde(default)]
    title: Option<String>,
}

async fn handle_create_conversation(
    State(state): State<AppState>,
    body: Result<Json<ConversationRequest>, JsonRejection>,
) -> Result<Json<ProcessResult>, AppError> {
    let Json(req) = body.map_err(|e| bad_request(e.body_text()))?;
    let result = state
        .pipeline
        .process_conversation_titled(&req.text, req.title.as_deref())
        .await?;
    Ok(Json(result))
}

// ============ GET /conversations/{id}/... ============

async fn handle_segments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<SegmentResponse>>, AppError> {
    let segments = get_segments(&**state.pipeline.store(), id).await?;
    Ok(Json(segments))
}

async fn handle_annotations(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BTreeMap<i64, Vec<AnnotationResponse>>>, AppError> {
    let grouped = get_annotations(&**state.pipeline.store(), id).await?;
    Ok(Json(grouped))
}
