//! Error types for the Docker execution sandbox.

use std::time::Duration;

/// Errors that can occur in the sandbox system.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// Docker daemon is not available or not running.
    #[error("Docker not available: {reason}")]
    DockerNotAvailable { reason: String },

    /// Image could not be pulled from its registry.
    #[error("Image pull failed for {image}: {reason}")]
    ImagePullFailed { image: String, reason: String },

    /// Failed to create container.
    #[error("Container creation failed: {reason}")]
    ContainerCreationFailed { reason: String },

    /// Failed to start container.
    #[error("Container start failed: {reason}")]
    ContainerStartFailed { reason: String },

    /// Output collection or exit-status retrieval failed.
    #[error("Execution failed: {reason}")]
    ExecutionFailed { reason: String },

    /// Operation exceeded its time bound.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Docker API error.
    #[error("Docker API error: {0}")]
    Docker(#[from] bollard::errors::Error),
}

/// Result type for sandbox operations.
pub type Result<T> = std::result::Result<T, SandboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docker_not_available_display() {
        let err = SandboxError::DockerNotAvailable {
            reason: "daemon not running".to_string(),
        };
        assert!(err.to_string().contains("daemon not running"));
        assert!(err.to_string().contains("Docker not available"));
    }

    #[test]
    fn test_image_pull_failed_display() {
        let err = SandboxError::ImagePullFailed {
            image: "sherlockproject/sherlock:latest".to_string(),
            reason: "manifest unknown".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("sherlockproject/sherlock:latest"));
        assert!(msg.contains("manifest unknown"));
    }

    #[test]
    fn test_container_creation_failed_display() {
        let err = SandboxError::ContainerCreationFailed {
            reason: "no space left on device".to_string(),
        };
        assert!(err.to_string().contains("no space left on device"));
    }

    #[test]
    fn test_timeout_display() {
        let err = SandboxError::Timeout(Duration::from_secs(30));
        let msg = err.to_string();
        assert!(msg.contains("timed out"));
        assert!(msg.contains("30"));
    }
}
