//! Bearer token authentication for the privileged gateway routes.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::error::RelayError;

#[derive(Clone)]
pub struct AuthState {
    token: Arc<SecretString>,
}

impl AuthState {
    pub fn new(token: SecretString) -> Self {
        Self {
            token: Arc::new(token),
        }
    }

    /// Constant-time check of an `Authorization` header value.
    fn accepts(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| {
                bool::from(
                    token
                        .as_bytes()
                        .ct_eq(self.token.expose_secret().as_bytes()),
                )
            })
    }
}

pub async fn auth_middleware(
    State(auth): State<AuthState>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    if auth.accepts(&headers) {
        return next.run(request).await;
    }

    tracing::warn!(path = %request.uri().path(), "Rejected unauthenticated privileged request");
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": RelayError::Unauthorized.to_string() })),
    )
        .into_response()
}
