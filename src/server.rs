//! HTTP server and web UI.
//!
//! Serves the same question-answering operation as `medrag ask` to
//! browsers and scripts.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Single-page UI (question box + evaluation picker) |
//! | `GET`  | `/health` | `{status, version, index_ready}` |
//! | `GET`  | `/questions` | The canned evaluation questions |
//! | `POST` | `/answer` | `{query}` → answer with sources |
//! | `POST` | `/evaluate` | `{question}` (0-based) → `{question, answer}` |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `upstream_error` (502),
//! `index_not_found` (503), `internal` (500).

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use medrag_core::models::Answer;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::context::QueryContext;
use crate::eval::EVAL_QUESTIONS;
use crate::index_store::IndexError;

const UI_HTML: &str = include_str!("ui.html");

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    ctx: Arc<QueryContext>,
}

/// Start the server on `[server].bind` and run until Ctrl-C.
pub async fn run_server(config: &Config) -> Result<()> {
    let ctx = Arc::new(QueryContext::initialize(config).await?);
    let listener = TcpListener::bind(&config.server.bind).await?;

    eprintln!("medrag listening on http://{}", listener.local_addr()?);
    if !ctx.is_ready() {
        eprintln!(
            "warning: index not found at {}; run `medrag index` and restart",
            ctx.index_path().display()
        );
    }

    serve(listener, ctx, shutdown_signal()).await
}

/// Serve requests on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, ctx: Arc<QueryContext>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

/// Build the route table.
pub fn router(ctx: Arc<QueryContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/questions", get(handle_questions))
        .route("/answer", post(handle_answer))
        .route("/evaluate", post(handle_evaluate))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { ctx })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

// ============ Error handling ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug)]
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

impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::NotFound { path } => AppError {
                status: StatusCode::SERVICE_UNAVAILABLE,
                code: "index_not_found",
                message: format!(
                    "Index not found at {}. Run: medrag index",
                    path.display()
                ),
            },
            other => AppError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "internal",
                message: other.to_string(),
            },
        }
    }
}

/// Failures from the embedding or generation services surface as 502.
fn upstream_error(err: anyhow::Error) -> AppError {
    tracing::warn!(error = %format!("{:#}", err), "query failed");
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "upstream_error",
        message: format!("{:#}", err),
    }
}

// ============ Handlers ============

async fn handle_index() -> Html<&'static str> {
    Html(UI_HTML)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    index_ready: bool,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        index_ready: state.ctx.is_ready(),
    })
}

#[derive(Serialize)]
struct QuestionsResponse {
    questions: &'static [&'static str],
}

async fn handle_questions() -> Json<QuestionsResponse> {
    Json(QuestionsResponse {
        questions: &EVAL_QUESTIONS,
    })
}

#[derive(Deserialize)]
struct AnswerRequest {
    query: String,
}

async fn answer_query(state: &AppState, query: &str) -> Result<Answer, AppError> {
    if query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    let pipeline = state.ctx.pipeline()?;
    pipeline.answer(query).await.map_err(upstream_error)
}

async fn handle_answer(
    State(state): State<AppState>,
    Json(req): Json<AnswerRequest>,
) -> Result<Json<Answer>, AppError> {
    Ok(Json(answer_query(&state, &req.query).await?))
}

#[derive(Deserialize)]
struct EvaluateRequest {
    question: usize,
}

#[derive(Serialize)]
struct EvaluateResponse {
    question: &'static str,
    answer: Answer,
}

async fn handle_evaluate(
    State(state): State<AppState>,
    Json(req): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, AppError> {
    let question = EVAL_QUESTIONS.get(req.question).copied().ok_or_else(|| {
        bad_request(format!(
            "question must be between 0 and {}",
            EVAL_QUESTIONS.len() - 1
        ))
    })?;
    let answer = answer_query(&state, question).await?;
    Ok(Json(EvaluateResponse { question, answer }))
}
