//! Telegram Bot API notifier.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;

use crate::error::NotifyError;
use crate::notify::{Alert, Notifier};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Posts alerts to one chat through `sendMessage` in HTML parse mode.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: SecretString,
    chat_id: String,
    timeout: Duration,
}

impl TelegramNotifier {
    pub fn new(client: reqwest::Client, bot_token: SecretString, chat_id: String) -> Self {
        Self {
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            bot_token,
            chat_id,
            timeout: Duration::from_secs(10),
        }
    }

    /// Point the notifier at a different Bot API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn failed(reason: impl Into<String>) -> NotifyError {
        NotifyError::SendFailed {
            notifier: "telegram".to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let url = format!(
            "{}/bot{}/sendMessage",
            self.api_base,
            self.bot_token.expose_secret()
        );
        let body = json!({
            "chat_id": self.chat_id,
            "text": alert.to_html(),
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        // The request URL carries the bot token, so it is stripped from errors.
        let response = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::failed(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v["description"].as_str().map(String::from))
                .unwrap_or_default();
            return Err(Self::failed(format!("HTTP {} {}", status, detail).trim_end().to_string()));
        }

        tracing::debug!(chat_id = %self.chat_id, "Telegram alert delivered");
        Ok(())
    }
}
