//! Alert delivery to operators.
//!
//! An [`Alert`] is rendered once per channel: HTML for Telegram, JSON for
//! the signed webhook. User-supplied text is always escaped before it is
//! placed in HTML.

pub mod telegram;
pub mod webhook;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::GatewayConfig;
use crate::error::NotifyError;

pub use telegram::TelegramNotifier;
pub use webhook::WebhookNotifier;

/// How urgent an alert is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Critical,
}

impl Severity {
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Info => "🔔",
            Self::Critical => "🚨",
        }
    }
}

/// A message for operators: a title plus labelled fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub severity: Severity,
    pub title: String,
    pub fields: Vec<(String, String)>,
    pub timestamp: DateTime<Utc>,
}

/// Body of `POST /api/notify`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserActivity {
    pub event: String,
    pub details: String,
    pub user: String,
    pub is_root: bool,
}

impl Alert {
    pub fn new(severity: Severity, title: impl Into<String>) -> Self {
        Self {
            severity,
            title: title.into(),
            fields: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn field(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((label.into(), value.into()));
        self
    }

    /// Alert for activity reported by the front end. Root activity is
    /// critical.
    pub fn user_activity(activity: &UserActivity) -> Self {
        let (severity, title) = if activity.is_root {
            (Severity::Critical, "Root activity")
        } else {
            (Severity::Info, "User activity")
        };
        Self::new(severity, title)
            .field("User", &activity.user)
            .field("Event", &activity.event)
            .field("Details", &activity.details)
    }

    pub fn panic_activated() -> Self {
        Self::new(Severity::Critical, "PANIC BUTTON ACTIVATED").field(
            "Details",
            "Critical services (proxy, databases) are being shut down immediately. \
             Manual intervention is required to restore the system.",
        )
    }

    pub fn panic_script_failed(reason: &str) -> Self {
        Self::new(Severity::Critical, "PANIC SCRIPT FAILED").field("Error", reason)
    }

    /// Telegram HTML rendering. Title and values are escaped.
    pub fn to_html(&self) -> String {
        let mut out = format!(
            "{} <b>{}</b>",
            self.severity.icon(),
            escape_html(&self.title)
        );
        for (label, value) in &self.fields {
            out.push_str(&format!(
                "\n<b>{}:</b> {}",
                escape_html(label),
                escape_html(value)
            ));
        }
        out.push_str(&format!(
            "\n<b>Time:</b> {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        out
    }

    pub fn to_json(&self) -> Value {
        let fields: serde_json::Map<String, Value> = self
            .fields
            .iter()
            .map(|(label, value)| (label.clone(), Value::String(value.clone())))
            .collect();
        json!({
            "severity": self.severity,
            "title": self.title,
            "fields": fields,
            "timestamp": self.timestamp.to_rfc3339(),
        })
    }
}

/// Escape the five characters Telegram's HTML parse mode reacts to.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// An alert channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, alert: &Alert) -> Result<(), NotifyError>;
}

/// Sends every alert to all inner notifiers. Succeeds when at least one
/// delivery succeeds.
pub struct FanoutNotifier {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self { notifiers }
    }
}

#[async_trait]
impl Notifier for FanoutNotifier {
    fn name(&self) -> &str {
        "fanout"
    }

    async fn send(&self, alert: &Alert) -> Result<(), NotifyError> {
        let results =
            futures::future::join_all(self.notifiers.iter().map(|n| n.send(alert))).await;

        let mut last_error = None;
        let mut delivered = false;
        for (notifier, result) in self.notifiers.iter().zip(results) {
            match result {
                Ok(()) => delivered = true,
                Err(e) => {
                    tracing::warn!(notifier = notifier.name(), error = %e, "Alert delivery failed");
                    last_error = Some(e);
                }
            }
        }

        match (delivered, last_error) {
            (true, _) => Ok(()),
            (false, Some(e)) => Err(e),
            (false, None) => Err(NotifyError::NotConfigured),
        }
    }
}

/// Build the notifier described by `config`, or `None` when no alert
/// channel is configured.
pub fn from_config(config: &GatewayConfig, client: reqwest::Client) -> Option<Arc<dyn Notifier>> {
    let mut notifiers: Vec<Arc<dyn Notifier>> = Vec::new();
    if let Some(ref telegram) = config.telegram {
        notifiers.push(Arc::new(TelegramNotifier::new(
            client.clone(),
            telegram.bot_token.clone(),
            telegram.chat_id.clone(),
        )));
    }
    if let Some(ref hook) = config.alert_webhook {
        notifiers.push(Arc::new(WebhookNotifier::new(
            client,
            hook.url.clone(),
            hook.secret.clone(),
        )));
    }

    match notifiers.len() {
        0 => None,
        1 => notifiers.pop(),
        _ => Some(Arc::new(FanoutNotifier::new(notifiers))),
    }
}
