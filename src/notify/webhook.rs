//! Signed JSON webhook notifier.
//!
//! Each alert is posted as `{event, timestamp, data}`. When a secret is
//! configured the raw body is signed with HMAC-SHA256 and sent as
//! `X-Webhook-Signature: sha256=<hex>`. Failed deliveries are retried with
//! exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::Sha256;
use url::Url;

use crate::error::NotifyError;
use crate::notify::{Alert, Notifier};

type HmacSha256 = Hmac<Sha256>;

/// Payload sent to the alert webhook.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub event: String,
    pub timestamp: String,
    pub data: serde_json::Value,
}

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Url,
    secret: Option<SecretString>,
    max_retries: u32,
    timeout: Duration,
    base_backoff: Duration,
}

impl WebhookNotifier {
    pub fn new(client: reqwest::Client, url: Url, secret: Option<SecretString>) -> Self {
        Self {
            client,
            url,
            secret,
            max_retries: 3,
            timeout: Duration::from_secs(10),
            base_backoff: Duration::from_millis(100),
        }
    }

    pub fn with_retries(mut self, max_retries: u32, base_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_backoff = base_backoff;
        self
    }

    fn failed(reason: impl Into<String>) -> NotifyError {
        NotifyError::SendFailed {
            notifier: "webhook".to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let payload = WebhookPayload {
            event: "alert".to_string(),
            timestamp: alert.timestamp.to_rfc3339(),
            data: alert.to_json(),
        };
        let body = serde_json::to_string(&payload).map_err(|e| Self::failed(e.to_string()))?;
        let signature = match self.secret {
            Some(ref secret) => Some(compute_hmac(secret.expose_secret(), &body)?),
            None => None,
        };

        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.base_backoff * 2u32.pow(attempt - 1)).await;
            }

            let mut request = self
                .client
                .post(self.url.clone())
                .header("Content-Type", "application/json")
                .header("X-Webhook-Event", &payload.event)
                .timeout(self.timeout)
                .body(body.clone());
            if let Some(ref signature) = signature {
                request = request.header("X-Webhook-Signature", signature);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => last_error = format!("HTTP {}", response.status()),
                Err(e) => last_error = e.to_string(),
            }
            tracing::debug!(attempt, error = %last_error, "Alert webhook attempt failed");
        }

        Err(Self::failed(last_error))
    }
}

/// `sha256=<hex>` HMAC of `payload` under `secret`.
pub fn compute_hmac(secret: &str, payload: &str) -> Result<String, NotifyError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| WebhookNotifier::failed(format!("invalid signing key: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;

    use super::*;
    use crate::notify::Severity;

    #[derive(Clone, Default)]
    struct Receiver {
        failures_left: Arc<AtomicUsize>,
        hits: Arc<AtomicUsize>,
        last: Arc<Mutex<Option<(Option<String>, String)>>>,
    }

    async fn receive(State(rx): State<Receiver>, headers: HeaderMap, body: String) -> StatusCode {
        rx.hits.fetch_add(1, Ordering::SeqCst);
        let signature = headers
            .get("x-webhook-signature")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        *rx.last.lock().unwrap() = Some((signature, body));

        let left = rx.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            rx.failures_left.store(left - 1, Ordering::SeqCst);
            return StatusCode::SERVICE_UNAVAILABLE;
        }
        StatusCode::NO_CONTENT
    }

    async fn spawn_receiver(failures: usize) -> (Url, Receiver) {
        let rx = Receiver::default();
        rx.failures_left.store(failures, Ordering::SeqCst);
        let app = Router::new()
            .route("/hook", post(receive))
            .with_state(rx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (Url::parse(&format!("http://{}/hook", addr)).unwrap(), rx)
    }

    #[test]
    fn test_compute_hmac_known_vector() {
        let sig = compute_hmac("key", "The quick brown fox jumps over the lazy dog").unwrap();
        assert_eq!(
            sig,
            "sha256=f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[tokio::test]
    async fn test_signed_delivery() {
        let (url, rx) = spawn_receiver(0).await;
        let notifier = WebhookNotifier::new(
            reqwest::Client::new(),
            url,
            Some(SecretString::from("shared-secret")),
        );

        notifier
            .send(&Alert::new(Severity::Info, "User activity"))
            .await
            .unwrap();

        let (signature, body) = rx.last.lock().unwrap().clone().unwrap();
        assert_eq!(signature.unwrap(), compute_hmac("shared-secret", &body).unwrap());
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["event"], "alert");
        assert_eq!(parsed["data"]["title"], "User activity");
    }

    #[tokio::test]
    async fn test_unsigned_delivery_has_no_signature() {
        let (url, rx) = spawn_receiver(0).await;
        WebhookNotifier::new(reqwest::Client::new(), url, None)
            .send(&Alert::panic_activated())
            .await
            .unwrap();

        let (signature, _) = rx.last.lock().unwrap().clone().unwrap();
        assert!(signature.is_none());
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let (url, rx) = spawn_receiver(2).await;
        WebhookNotifier::new(reqwest::Client::new(), url, None)
            .with_retries(3, Duration::from_millis(1))
            .send(&Alert::panic_activated())
            .await
            .unwrap();

        assert_eq!(rx.hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let (url, rx) = spawn_receiver(10).await;
        let err = WebhookNotifier::new(reqwest::Client::new(), url, None)
            .with_retries(2, Duration::from_millis(1))
            .send(&Alert::panic_activated())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("503"));
        assert_eq!(rx.hits.load(Ordering::SeqCst), 3);
    }
}
