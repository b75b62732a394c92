//! HTTP surface of the orchestrator.
//!
//! - `POST /execute`: run a tool, `{toolId, args}` → `{success, output | error}`
//! - `GET  /tools`: registered tools with their argument schema
//! - `GET  /health`: liveness probe

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::error::ToolError;
use crate::orchestrator::{ExecutionRequest, ExecutionResult, Orchestrator};

/// HTTP status for a failed execution.
pub fn status_for(error: &ToolError) -> StatusCode {
    match error {
        ToolError::NotFound { .. } => StatusCode::NOT_FOUND,
        ToolError::InvalidParameters { .. } => StatusCode::BAD_REQUEST,
        ToolError::ImageUnavailable { .. }
        | ToolError::Sandbox { .. }
        | ToolError::NonZeroExit { .. }
        | ToolError::Timeout { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/execute", post(execute_handler))
        .route("/tools", get(tools_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(orchestrator)
}

async fn execute_handler(
    State(orchestrator): State<Arc<Orchestrator>>,
    body: Result<Json<ExecutionRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ExecutionResult::failure(format!(
                    "Invalid request body: {}",
                    rejection.body_text()
                ))),
            );
        }
    };

    match orchestrator.execute_request(&request).await {
        Ok(output) => (StatusCode::OK, Json(ExecutionResult::ok(output))),
        Err(e) => (status_for(&e), Json(ExecutionResult::failure(e.to_string()))),
    }
}

async fn tools_handler(State(orchestrator): State<Arc<Orchestrator>>) -> impl IntoResponse {
    Json(json!({ "tools": orchestrator.registry().summaries() }))
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "orchestrator" }))
}
