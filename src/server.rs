//! HTTP API for the conversational layer.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/toc` | Catalog entries plus the formatted table of contents |
//! | `GET`  | `/sops/{id}` | One resolved SOP |
//! | `GET`  | `/sops?q=…&limit=…` | Best-effort search |
//! | `POST` | `/tools/get_sop` | Tool call: `{"sop_id": "…"}` |
//! | `POST` | `/tools/find_sops` | Tool call: `{"query": "…", "limit": 3}` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "SOP not found: sop-x (not in catalog)" } }
//! ```
//!
//! | Code | Status |
//! |------|--------|
//! | `bad_request` | 400 |
//! | `not_found` | 404 |
//! | `corrupt_document` | 422 |
//! | `store_unavailable` | 503 |
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so browser-based chat
//! front-ends can call the API directly.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use sop_knowledge_core::{KnowledgeError, Sop, TocEntry};

use crate::config::Config;
use crate::get::SopToolResponse;
use crate::search::SearchResponse;
use crate::service::KnowledgeService;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    service: Arc<KnowledgeService>,
}

/// Build the knowledge service from `config` and serve on `[server].bind`.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let service = Arc::new(KnowledgeService::from_config(config)?);
    let listener = TcpListener::bind(&config.server.bind).await?;
    serve(listener, service).await
}

/// Serve the API on an already-bound listener until the process ends.
pub async fn serve(listener: TcpListener, service: Arc<KnowledgeService>) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(
        %addr,
        sops = service.toc().len(),
        store = service.store_kind(),
        "SOP knowledge server listening"
    );
    axum::serve(listener, router(service)).await?;
    Ok(())
}

pub fn router(service: Arc<KnowledgeService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/toc", get(handle_toc))
        .route("/sops", get(handle_search))
        .route("/sops/{id}", get(handle_get))
        .route("/tools/get_sop", post(handle_tool_get_sop))
        .route("/tools/find_sops", post(handle_tool_find_sops))
        .layer(cors)
        .with_state(AppState { service })
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

impl From<KnowledgeError> for AppError {
    fn from(err: KnowledgeError) -> Self {
        let status = match err {
            KnowledgeError::NotFound { .. } => StatusCode::NOT_FOUND,
            KnowledgeError::CorruptDocument { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            KnowledgeError::StoreUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };
        AppError {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// Decode a tool-call body, reporting shape errors through the error contract.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        bad_request(format!("invalid query string: {}", rejection.body_text()))
    }
}

fn parse_params<T: for<'de> Deserialize<'de>>(params: serde_json::Value) -> Result<T, AppError> {
    serde_json::from_value(params).map_err(|e| bad_request(format!("invalid parameters: {}", e)))
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

// ============ GET /toc ============

#[derive(Serialize)]
struct TocResponse {
    entries: Vec<TocEntry>,
    formatted: String,
}

async fn handle_toc(State(state): State<AppState>) -> Json<TocResponse> {
    Json(TocResponse {
        entries: state.service.toc().all_entries().to_vec(),
        formatted: state.service.formatted_toc(),
    })
}

// ============ GET /sops/{id} ============

async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Sop>, AppError> {
    let sop = state.service.get_sop(&id).await?;
    Ok(Json(sop))
}

// ============ GET /sops?q= ============

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
    limit: Option<usize>,
}

async fn handle_search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, AppError> {
    let Query(params) = params?;
    let query = params
        .q
        .ok_or_else(|| bad_request("missing query parameter: q"))?;
    let limit = params
        .limit
        .unwrap_or_else(|| state.service.default_limit());
    let results = state.service.find_sops(&query, limit).await;
    Ok(Json(SearchResponse { results }))
}

// ============ POST /tools/get_sop ============

#[derive(Deserialize)]
struct GetSopParams {
    sop_id: String,
}

async fn handle_tool_get_sop(
    State(state): State<AppState>,
    params: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(params) = params?;
    let params: GetSopParams = parse_params(params)?;
    if params.sop_id.trim().is_empty() {
        return Err(bad_request("sop_id must not be empty"));
    }

    let sop = state.service.get_sop(&params.sop_id).await?;
    Ok(Json(
        serde_json::json!({ "result": SopToolResponse::from(sop) }),
    ))
}

// ============ POST /tools/find_sops ============

#[derive(Deserialize)]
struct FindSopsParams {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

async fn handle_tool_find_sops(
    State(state): State<AppState>,
    params: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(params) = params?;
    let params: FindSopsParams = parse_params(params)?;
    let limit = params
        .limit
        .unwrap_or_else(|| state.service.default_limit());

    let results = state.service.find_sops(&params.query, limit).await;
    Ok(Json(
        serde_json::json!({ "result": SearchResponse { results } }),
    ))
}
