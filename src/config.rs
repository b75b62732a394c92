//! Configuration for the orchestrator and gateway processes.
//!
//! Values come from the environment (optionally seeded from a `.env` file
//! by the binary). Both configs are parsed once at start-up, wrapped in an
//! `Arc` by the caller and never mutated afterwards.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::ConfigError;
use crate::safety::ServiceAllowlist;
use crate::sandbox::ResourceLimits;

pub const DEFAULT_ORCHESTRATOR_PORT: u16 = 4000;
pub const DEFAULT_GATEWAY_PORT: u16 = 3000;
pub const DEFAULT_ORCHESTRATOR_URL: &str = "http://mcp-server:4000";
pub const DEFAULT_PANIC_SCRIPT: &str = "/opt/scripts/panic_mode.sh";

/// Settings for `toolgate orchestrator` and `toolgate exec`.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub bind: SocketAddr,
    /// Docker socket path; `None` uses the local defaults (`DOCKER_HOST`
    /// or the platform socket).
    pub docker_socket: Option<PathBuf>,
    pub limits: ResourceLimits,
}

impl OrchestratorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ResourceLimits::default();
        let memory_mb: u64 = parse_or(&lookup, "TOOL_MEMORY_LIMIT_MB", 512)?;
        let limits = ResourceLimits {
            pull_timeout: secs_or(&lookup, "TOOL_PULL_TIMEOUT_SECS", defaults.pull_timeout)?,
            run_timeout: secs_or(&lookup, "TOOL_RUN_TIMEOUT_SECS", defaults.run_timeout)?,
            memory_bytes: memory_mb.saturating_mul(1024 * 1024),
            max_concurrent: positive(&lookup, "TOOL_MAX_CONCURRENT", defaults.max_concurrent)?,
            capture_bytes: positive(&lookup, "TOOL_OUTPUT_CAPTURE_BYTES", defaults.capture_bytes)?,
            max_output_chars: defaults.max_output_chars,
        };

        Ok(Self {
            bind: parse_or(&lookup, "ORCHESTRATOR_BIND", SocketAddr::from(([0, 0, 0, 0], DEFAULT_ORCHESTRATOR_PORT)))?,
            docker_socket: non_empty(&lookup, "DOCKER_SOCKET").map(PathBuf::from),
            limits,
        })
    }
}

/// Telegram Bot API credentials. Both halves are required.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub chat_id: String,
}

/// Generic JSON webhook receiving alerts.
#[derive(Debug, Clone)]
pub struct AlertWebhookConfig {
    pub url: Url,
    pub secret: Option<SecretString>,
}

/// Settings for `toolgate gateway`.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind: SocketAddr,
    pub orchestrator_url: Url,
    /// Upper bound on one relayed execution, pull and run included.
    pub relay_timeout: Duration,
    /// Container CLI used for `<cli> <action> <service>`.
    pub container_cli: String,
    pub command_timeout: Duration,
    pub panic_script: PathBuf,
    /// Delay between acknowledging a panic and acting on it.
    pub panic_grace: Duration,
    pub services: ServiceAllowlist,
    /// Bearer token for the privileged routes. `None` leaves them open.
    pub auth_token: Option<SecretString>,
    pub telegram: Option<TelegramConfig>,
    pub alert_webhook: Option<AlertWebhookConfig>,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let orchestrator_url = match non_empty(&lookup, "ORCHESTRATOR_URL") {
            Some(raw) => parse_url("ORCHESTRATOR_URL", &raw)?,
            None => parse_url("ORCHESTRATOR_URL", DEFAULT_ORCHESTRATOR_URL)?,
        };

        let services = match non_empty(&lookup, "SERVICE_ALLOWLIST") {
            Some(csv) => {
                let list =
                    ServiceAllowlist::from_csv(&csv).map_err(|bad| ConfigError::InvalidValue {
                        key: "SERVICE_ALLOWLIST".to_string(),
                        message: format!("'{}' is not a valid service name", bad),
                    })?;
                if list.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        key: "SERVICE_ALLOWLIST".to_string(),
                        message: "must name at least one service".to_string(),
                    });
                }
                list
            }
            None => ServiceAllowlist::builtin(),
        };

        let telegram = match (
            non_empty(&lookup, "TELEGRAM_BOT_TOKEN"),
            non_empty(&lookup, "TELEGRAM_ROOT_CHAT_ID"),
        ) {
            (Some(token), Some(chat_id)) => Some(TelegramConfig {
                bot_token: SecretString::from(token),
                chat_id,
            }),
            (None, None) => None,
            _ => {
                tracing::warn!(
                    "Only one of TELEGRAM_BOT_TOKEN / TELEGRAM_ROOT_CHAT_ID is set; Telegram alerts disabled"
                );
                None
            }
        };

        let alert_webhook = match non_empty(&lookup, "ALERT_WEBHOOK_URL") {
            Some(raw) => Some(AlertWebhookConfig {
                url: parse_url("ALERT_WEBHOOK_URL", &raw)?,
                secret: non_empty(&lookup, "ALERT_WEBHOOK_SECRET").map(SecretString::from),
            }),
            None => None,
        };

        Ok(Self {
            bind: parse_or(&lookup, "GATEWAY_BIND", SocketAddr::from(([0, 0, 0, 0], DEFAULT_GATEWAY_PORT)))?,
            orchestrator_url,
            relay_timeout: secs_or(&lookup, "GATEWAY_RELAY_TIMEOUT_SECS", Duration::from_secs(480))?,
            container_cli: non_empty(&lookup, "CONTAINER_CLI").unwrap_or_else(|| "docker".to_string()),
            command_timeout: secs_or(&lookup, "SERVICE_COMMAND_TIMEOUT_SECS", Duration::from_secs(60))?,
            panic_script: non_empty(&lookup, "PANIC_SCRIPT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PANIC_SCRIPT)),
            panic_grace: Duration::from_millis(parse_or(&lookup, "PANIC_ACK_GRACE_MS", 250)?),
            services,
            auth_token: non_empty(&lookup, "GATEWAY_AUTH_TOKEN").map(SecretString::from),
            telegram,
            alert_webhook,
        })
    }

    /// Whether any alert channel is configured.
    pub fn has_notifier(&self) -> bool {
        self.telegram.is_some() || self.alert_webhook.is_some()
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup, key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{}': {}", raw, e),
        }),
        None => Ok(default),
    }
}

fn secs_or<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_or(lookup, key, default.as_secs())?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}

fn positive<F>(lookup: &F, key: &str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value: usize = parse_or(lookup, key, default)?;
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{}': {}", raw, e),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}
