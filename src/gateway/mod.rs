//! Public gateway: execution relay plus the privileged operations relay.
//!
//! ```text
//! GET  /api/health, /health      liveness
//! POST /api/mcp/execute          ──▶ orchestrator POST /execute
//! POST /api/notify               ──▶ Notifier (background)
//! POST /api/service/{action}     ──▶ <cli> <action> <service>   [auth]
//! POST /api/panic                ──▶ alert + panic script       [auth]
//! ```

pub mod auth;
pub mod command;
pub mod panic;
pub mod relay;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use secrecy::SecretString;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::error::{ConfigError, RelayError};
use crate::notify::{self, Alert, Notifier, UserActivity};

pub use auth::AuthState;
pub use command::{CommandOutput, CommandRunner, HostCommandRunner};
pub use panic::{PanicCoordinator, PanicState};
pub use relay::{ExecutionRelay, RelayResponse};
pub use services::{ServiceController, ServiceOutcome};

/// Upper bound on the panic script, which stops many services in turn.
const PANIC_SCRIPT_TIMEOUT: Duration = Duration::from_secs(300);

/// Everything the gateway handlers share.
pub struct GatewayState {
    pub relay: ExecutionRelay,
    pub services: ServiceController,
    pub panic: Arc<PanicCoordinator>,
    pub notifier: Option<Arc<dyn Notifier>>,
}

impl GatewayState {
    /// Wire the gateway from configuration with real host processes and
    /// HTTP notifiers.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::new();
        let notifier = notify::from_config(config, client.clone());

        let relay = ExecutionRelay::new(client, &config.orchestrator_url, config.relay_timeout)?;
        let services = ServiceController::new(
            config.container_cli.clone(),
            config.services.clone(),
            Arc::new(HostCommandRunner::new(config.command_timeout)),
        );
        let panic = Arc::new(PanicCoordinator::new(
            config.panic_script.clone(),
            config.panic_grace,
            Arc::new(HostCommandRunner::new(PANIC_SCRIPT_TIMEOUT)),
            notifier.clone(),
        ));

        Ok(Self {
            relay,
            services,
            panic,
            notifier,
        })
    }
}

/// Build the gateway router. With `auth_token` set, the service and panic
/// routes require `Authorization: Bearer <token>`.
pub fn router(state: Arc<GatewayState>, auth_token: Option<SecretString>) -> Router {
    let mut privileged = Router::new()
        .route("/api/service/{action}", post(service_handler))
        .route("/api/panic", post(panic_handler));
    match auth_token {
        Some(token) => {
            privileged = privileged.route_layer(middleware::from_fn_with_state(
                AuthState::new(token),
                auth::auth_middleware,
            ));
        }
        None => {
            tracing::warn!("GATEWAY_AUTH_TOKEN not set; service and panic routes are unauthenticated");
        }
    }

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/health", get(health_handler))
        .route("/api/mcp/execute", post(execute_handler))
        .route("/api/notify", post(notify_handler))
        .merge(privileged)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok", "message": "Backend is running" }))
}

async fn execute_handler(State(state): State<Arc<GatewayState>>, body: Bytes) -> Response {
    match state.relay.forward(body).await {
        Ok(upstream) => (
            upstream.status,
            [(header::CONTENT_TYPE, upstream.content_type)],
            upstream.body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Could not reach orchestrator");
            relay_error_response(&e)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ServiceRequest {
    service_name: String,
}

async fn service_handler(
    State(state): State<Arc<GatewayState>>,
    Path(action): Path<String>,
    body: Result<Json<ServiceRequest>, JsonRejection>,
) -> Response {
    let service = body.map(|Json(b)| b.service_name).unwrap_or_default();

    match state.services.perform(&action, &service).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => {
            tracing::warn!(action = %action, service = %service, error = %e, "Service action failed");
            relay_error_response(&e)
        }
    }
}

async fn panic_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    let message = if state.panic.trigger() {
        "Panic sequence initiated."
    } else {
        "Panic sequence already in progress."
    };
    (
        StatusCode::ACCEPTED,
        Json(json!({ "status": "accepted", "message": message })),
    )
}

async fn notify_handler(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<UserActivity>, JsonRejection>,
) -> impl IntoResponse {
    let Some(notifier) = state.notifier.clone() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "error", "message": "No alert notifier is configured." })),
        );
    };
    let activity = match body {
        Ok(Json(activity)) => activity,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "status": "error", "message": rejection.body_text() })),
            );
        }
    };

    let alert = Alert::user_activity(&activity);
    tokio::spawn(async move {
        if let Err(e) = notifier.send(&alert).await {
            tracing::warn!(error = %e, "Failed to deliver activity alert");
        }
    });
    (StatusCode::OK, Json(json!({ "status": "sent" })))
}

/// HTTP status and body for a relay failure.
pub fn relay_error_response(error: &RelayError) -> Response {
    let (status, body) = match error {
        RelayError::InvalidAction { .. } => {
            (StatusCode::BAD_REQUEST, json!({ "error": "Invalid action." }))
        }
        RelayError::InvalidService { .. } => (
            StatusCode::BAD_REQUEST,
            json!({ "error": "Invalid or disallowed service name." }),
        ),
        RelayError::CommandFailed { stderr, .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "Failed to execute command.", "details": stderr }),
        ),
        RelayError::CommandTimedOut { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "error": "Failed to execute command.", "details": error.to_string() }),
        ),
        RelayError::UpstreamUnavailable { .. } => (
            StatusCode::BAD_GATEWAY,
            json!({ "error": "Bad Gateway", "details": "Could not connect to the MCP server." }),
        ),
        RelayError::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            json!({ "error": error.to_string() }),
        ),
    };
    (status, Json(body)).into_response()
}
