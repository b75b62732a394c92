//! Error types for toolgate.

use std::time::Duration;

use crate::sandbox::SandboxError;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Tool execution errors.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool '{name}' not found")]
    NotFound { name: String },

    #[error("Invalid parameters for tool {name}: {reason}")]
    InvalidParameters { name: String, reason: String },

    #[error("Image {image} for tool {name} is unavailable: {source}")]
    ImageUnavailable {
        name: String,
        image: String,
        #[source]
        source: SandboxError,
    },

    #[error("Sandbox error for tool {name}: {source}")]
    Sandbox {
        name: String,
        #[source]
        source: SandboxError,
    },

    #[error("Container for tool {name} exited with status code {code}. Output: {output}")]
    NonZeroExit {
        name: String,
        code: i64,
        output: String,
    },

    #[error("Tool {name} timed out after {timeout:?}")]
    Timeout { name: String, timeout: Duration },
}

/// Errors from the execution relay and the privileged operations relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Invalid action: {action}")]
    InvalidAction { action: String },

    #[error("Invalid or disallowed service name: {service}")]
    InvalidService { service: String },

    #[error("Command `{command}` failed: {reason}")]
    CommandFailed {
        command: String,
        reason: String,
        stderr: String,
    },

    #[error("Command `{command}` timed out after {timeout:?}")]
    CommandTimedOut { command: String, timeout: Duration },

    #[error("Upstream orchestrator unavailable: {reason}")]
    UpstreamUnavailable { reason: String },

    #[error("Invalid or missing auth token")]
    Unauthorized,
}

/// Alert delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("No alert notifier is configured")]
    NotConfigured,

    #[error("Notifier {notifier} failed to deliver alert: {reason}")]
    SendFailed { notifier: String, reason: String },
}

/// HTTP server lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Server {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },
}

/// Result type alias for toolgate.
pub type Result<T> = std::result::Result<T, Error>;
