//! HTTP server.
//!
//! Serves a one-page UI and a small JSON API over the setup and ask flows.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Question box with "Ask AI" and "Create Index and Embeddings" buttons |
//! | `POST` | `/api/setup` | Provision the index and ingest the documents directory |
//! | `POST` | `/api/read` | Answer a question: `{ "data": "<answer>" }` or `{ "data": null }` |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `setup_failed` (500), `upstream_error` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::pipeline::{run_ask, run_setup};
use crate::services::Services;

const INDEX_PAGE: &str = include_str!("page.html");

const SETUP_SUCCESS: &str = "Successfully created index and loaded data into pinecone.";

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    services: Services,
}

/// Starts the server with clients built from `config` and the environment.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let services = Services::from_config(config)?;
    run_server_with_services(config, services).await
}

/// Starts the server on `[server].bind` with the given backends. Runs until
/// the process is terminated.
pub async fn run_server_with_services(config: &Config, services: Services) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(config, services);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router without binding.
pub fn router(config: &Config, services: Services) -> Router {
    let state = AppState {
        config: Arc::new(config.clone()),
        services,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_index))
        .route("/api/setup", post(handle_setup))
        .route("/api/read", post(handle_read))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
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

fn internal(code: &str, err: anyhow::Error) -> AppError {
    // `{:#}` keeps the whole context chain on one line.
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: code.to_string(),
        message: format!("{:#}", err),
    }
}

// ============ Handlers ============

#[derive(Serialize)]
struct DataResponse {
    data: Option<String>,
}

async fn handle_index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

/// Handler for `POST /api/setup`. The request body is ignored.
async fn handle_setup(State(state): State<AppState>) -> Result<Json<DataResponse>, AppError> {
    match run_setup(&state.config, &state.services).await {
        Ok(report) => {
            tracing::info!(
                index = %report.index,
                status = ?report.index_status,
                vectors = report.stats.vectors_upserted,
                "setup finished"
            );
            Ok(Json(DataResponse {
                data: Some(SETUP_SUCCESS.to_string()),
            }))
        }
        Err(e) => {
            tracing::error!(error = %format!("{:#}", e), "setup failed");
            Err(internal("setup_failed", e))
        }
    }
}

/// Accepted `/api/read` bodies: a bare JSON string or `{ "question": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ReadRequest {
    Bare(String),
    Object { question: String },
}

/// Pulls the question out of a request body. Anything that is not one of
/// the JSON shapes is taken as plain text.
fn parse_question(body: &[u8]) -> String {
    match serde_json::from_slice::<ReadRequest>(body) {
        Ok(ReadRequest::Bare(q)) | Ok(ReadRequest::Object { question: q }) => q,
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}

/// Handler for `POST /api/read`.
async fn handle_read(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DataResponse>, AppError> {
    let question = parse_question(&body);
    let question = question.trim();
    if question.is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let answer = run_ask(&state.config, &state.services, question)
        .await
        .map_err(|e| {
            tracing::error!(error = %format!("{:#}", e), "read failed");
            internal("upstream_error", e)
        })?;

    Ok(Json(DataResponse { data: answer }))
}

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
