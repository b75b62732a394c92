//! Pass-through relay from the public gateway to the orchestrator.
//!
//! The request body is forwarded byte for byte and the orchestrator's
//! status and body are returned unchanged. Validation stays in the
//! orchestrator.

use std::time::Duration;

use axum::http::{HeaderValue, StatusCode, header};
use bytes::Bytes;
use url::Url;

use crate::error::{ConfigError, RelayError};

/// What the orchestrator answered.
#[derive(Debug, Clone)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub content_type: HeaderValue,
    pub body: Bytes,
}

pub struct ExecutionRelay {
    client: reqwest::Client,
    execute_url: Url,
    timeout: Duration,
}

impl ExecutionRelay {
    pub fn new(
        client: reqwest::Client,
        orchestrator_url: &Url,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let mut base = orchestrator_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let execute_url = base.join("execute").map_err(|e| ConfigError::InvalidValue {
            key: "ORCHESTRATOR_URL".to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            client,
            execute_url,
            timeout,
        })
    }

    pub fn execute_url(&self) -> &Url {
        &self.execute_url
    }

    /// Forward an execution request body to the orchestrator.
    pub async fn forward(&self, body: Bytes) -> Result<RelayResponse, RelayError> {
        let response = self
            .client
            .post(self.execute_url.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .body(body)
            .send()
            .await
            .map_err(|e| RelayError::UpstreamUnavailable {
                reason: e.to_string(),
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("application/json"));
        let body = response
            .bytes()
            .await
            .map_err(|e| RelayError::UpstreamUnavailable {
                reason: e.to_string(),
            })?;

        tracing::debug!(status = status.as_u16(), "Orchestrator responded");
        Ok(RelayResponse {
            status,
            content_type,
            body,
        })
    }
}
