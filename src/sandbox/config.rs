//! Resource limits applied to every tool execution.

use std::time::Duration;

/// Maximum number of characters of tool output returned to callers.
pub const MAX_OUTPUT_CHARS: usize = 5000;

/// Bounds applied to image pulls, container runs and captured output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Upper bound on a single image pull.
    pub pull_timeout: Duration,
    /// Upper bound on a single container run; expiry force-removes the container.
    pub run_timeout: Duration,
    /// Memory limit per container in bytes.
    pub memory_bytes: u64,
    /// Maximum number of containers running at the same time.
    pub max_concurrent: usize,
    /// Bytes of raw output kept in memory per execution; the rest is discarded.
    pub capture_bytes: usize,
    /// Characters of output returned to the caller before truncation.
    pub max_output_chars: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            pull_timeout: Duration::from_secs(300),
            run_timeout: Duration::from_secs(120),
            memory_bytes: 512 * 1024 * 1024,
            max_concurrent: 4,
            capture_bytes: 256 * 1024,
            max_output_chars: MAX_OUTPUT_CHARS,
        }
    }
}
