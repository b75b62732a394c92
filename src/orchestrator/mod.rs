//! Tool execution orchestrator.
//!
//! Owns the full sequence for one tool invocation:
//!
//! ```text
//! prepare args ─▶ permit ─▶ image present? ─no─▶ pull (bounded)
//!                                 │
//!                                 ▼
//!                     create container (lease)
//!                                 │
//!                     run to completion (bounded)
//!                                 │
//!                     release lease (always)
//!                                 │
//!              exit 0 ─▶ truncated output   exit ≠ 0 ─▶ NonZeroExit
//! ```

pub mod api;

use std::borrow::Cow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Semaphore;

use crate::error::ToolError;
use crate::safety::redact_arguments;
use crate::sandbox::{
    ContainerLease, ContainerRuntime, ContainerSpec, OutputBuffer, ResourceLimits, SandboxError,
};
use crate::tools::{ToolInvocation, ToolRegistry};

/// Appended to output that was cut at the character limit.
pub const TRUNCATION_MARKER: &str = "\n... (output truncated)";

/// Cut `output` to `max_chars` characters and append [`TRUNCATION_MARKER`].
///
/// Output within the limit is returned unchanged. Truncating twice gives the
/// same result as truncating once.
pub fn truncate_output(output: &str, max_chars: usize) -> Cow<'_, str> {
    if output.chars().count() <= max_chars {
        return Cow::Borrowed(output);
    }

    let cut = output
        .char_indices()
        .nth(max_chars)
        .map_or(output.len(), |(i, _)| i);
    Cow::Owned(format!("{}{}", &output[..cut], TRUNCATION_MARKER))
}

/// Body of `POST /execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRequest {
    pub tool_id: String,
    #[serde(default)]
    pub args: Value,
}

/// Structured outcome returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }
}

/// Runs registered tools in ephemeral containers.
pub struct Orchestrator {
    runtime: Arc<dyn ContainerRuntime>,
    registry: Arc<ToolRegistry>,
    limits: ResourceLimits,
    permits: Semaphore,
}

impl Orchestrator {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        registry: Arc<ToolRegistry>,
        limits: ResourceLimits,
    ) -> Self {
        let permits = Semaphore::new(limits.max_concurrent.max(1));
        Self {
            runtime,
            registry,
            limits,
            permits,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute `tool_id` with `args` and return its (truncated) output.
    ///
    /// Unknown tools and invalid arguments are rejected before the runtime
    /// is touched. Once a container exists it is removed before this
    /// returns, whatever the outcome.
    pub async fn execute(&self, tool_id: &str, args: &Value) -> Result<String, ToolError> {
        let invocation = self.registry.prepare(tool_id, args)?;

        let _permit = self.permits.acquire().await.map_err(|_| {
            let closed = SandboxError::ExecutionFailed {
                reason: "execution slots closed".to_string(),
            };
            sandbox_error(&invocation, closed)
        })?;

        tracing::info!(
            tool = invocation.tool_id(),
            args = %redact_arguments(args),
            "Executing tool"
        );

        self.ensure_image(&invocation).await?;

        let spec = ContainerSpec {
            image: invocation.image(),
            argv: invocation.argv(),
            memory_bytes: self.limits.memory_bytes,
        };
        let lease = ContainerLease::acquire(Arc::clone(&self.runtime), &spec)
            .await
            .map_err(|e| sandbox_error(&invocation, e))?;

        let mut output = OutputBuffer::new(self.limits.capture_bytes);
        let outcome = tokio::time::timeout(self.limits.run_timeout, lease.run(&mut output)).await;
        lease.release().await;

        if output.dropped_bytes() > 0 {
            tracing::debug!(
                tool = invocation.tool_id(),
                dropped = output.dropped_bytes(),
                "Output exceeded capture buffer"
            );
        }

        let code = match outcome {
            Err(_) => {
                return Err(ToolError::Timeout {
                    name: invocation.tool_id().to_string(),
                    timeout: self.limits.run_timeout,
                });
            }
            Ok(Err(e)) => return Err(sandbox_error(&invocation, e)),
            Ok(Ok(code)) => code,
        };

        let text = truncate_output(output.as_str(), self.limits.max_output_chars).into_owned();
        if code != 0 {
            return Err(ToolError::NonZeroExit {
                name: invocation.tool_id().to_string(),
                code,
                output: text,
            });
        }

        tracing::info!(tool = invocation.tool_id(), "Tool execution succeeded");
        Ok(text)
    }

    /// [`execute`](Self::execute) for a wire request, logging failures.
    pub async fn execute_request(
        &self,
        request: &ExecutionRequest,
    ) -> Result<String, ToolError> {
        let result = self.execute(&request.tool_id, &request.args).await;
        if let Err(ref e) = result {
            tracing::warn!(
                tool = %request.tool_id,
                args = %redact_arguments(&request.args),
                error = %e,
                "Tool execution failed"
            );
        }
        result
    }

    async fn ensure_image(&self, invocation: &ToolInvocation) -> Result<(), ToolError> {
        let image = invocation.image();
        let unavailable = |source: SandboxError| ToolError::ImageUnavailable {
            name: invocation.tool_id().to_string(),
            image: image.to_string(),
            source,
        };

        if self.runtime.image_exists(&image).await.map_err(unavailable)? {
            tracing::debug!(image = %image, "Image found locally");
            return Ok(());
        }

        tracing::info!(image = %image, "Image not found locally, pulling");
        tokio::time::timeout(self.limits.pull_timeout, self.runtime.pull_image(&image))
            .await
            .map_err(|_| SandboxError::Timeout(self.limits.pull_timeout))
            .and_then(|pulled| pulled)
            .map_err(unavailable)?;
        tracing::info!(image = %image, "Image pull complete");
        Ok(())
    }
}

fn sandbox_error(invocation: &ToolInvocation, source: SandboxError) -> ToolError {
    ToolError::Sandbox {
        name: invocation.tool_id().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::sandbox::testing::{Counts, FakeRuntime};

    fn orchestrator(fake: &Arc<FakeRuntime>) -> Orchestrator {
        orchestrator_with(fake, ResourceLimits::default())
    }

    fn orchestrator_with(fake: &Arc<FakeRuntime>, limits: ResourceLimits) -> Orchestrator {
        Orchestrator::new(fake.clone(), Arc::new(ToolRegistry::builtin()), limits)
    }

    #[test]
    fn test_truncate_short_output_unchanged() {
        let out = truncate_output("short", 5000);
        assert!(matches!(out, Cow::Borrowed("short")));
    }

    #[test]
    fn test_truncate_exact_limit_unchanged() {
        let text = "x".repeat(5000);
        assert_eq!(truncate_output(&text, 5000), text);
    }

    #[test]
    fn test_truncate_long_output() {
        let text = "y".repeat(5001);
        let out = truncate_output(&text, 5000);
        assert!(out.ends_with(TRUNCATION_MARKER));
        assert_eq!(out.chars().count(), 5000 + TRUNCATION_MARKER.chars().count());
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let text = "é".repeat(10);
        let out = truncate_output(&text, 4);
        assert_eq!(out, format!("éééé{}", TRUNCATION_MARKER));
    }

    #[test]
    fn test_truncate_is_idempotent() {
        for len in [0, 10, 5000, 5001, 12000] {
            let text = "z".repeat(len);
            let once = truncate_output(&text, 5000).into_owned();
            let twice = truncate_output(&once, 5000).into_owned();
            assert_eq!(once, twice, "len {}", len);
        }
    }

    #[test]
    fn test_truncate_cuts_output_ending_in_marker() {
        let text = format!("{}{}", "a".repeat(4990), TRUNCATION_MARKER);
        let out = truncate_output(&text, 5000);
        assert_ne!(out, text);
        assert_eq!(out.chars().count(), 5000 + TRUNCATION_MARKER.chars().count());
        assert!(out.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_execution_result_serialization() {
        let ok = serde_json::to_value(ExecutionResult::ok("done")).unwrap();
        assert_eq!(ok, json!({"success": true, "output": "done"}));

        let failed = serde_json::to_value(ExecutionResult::failure("boom")).unwrap();
        assert_eq!(failed, json!({"success": false, "error": "boom"}));
    }

    #[test]
    fn test_execution_request_wire_names() {
        let req: ExecutionRequest =
            serde_json::from_value(json!({"toolId": "spiderfoot", "args": {"target": "a.com"}}))
                .unwrap();
        assert_eq!(req.tool_id, "spiderfoot");
        assert_eq!(req.args["target"], "a.com");

        let req: ExecutionRequest = serde_json::from_value(json!({"toolId": "x"})).unwrap();
        assert!(req.args.is_null());
    }

    #[tokio::test]
    async fn test_unknown_tool_never_touches_runtime() {
        let fake = Arc::new(FakeRuntime::new());
        let err = orchestrator(&fake)
            .execute("unknown-tool", &json!({}))
            .await
            .unwrap_err();

        assert!(err.to_string().ends_with("not found"));
        assert_eq!(fake.counts(), Counts::default());
    }

    #[tokio::test]
    async fn test_missing_argument_never_touches_runtime() {
        let fake = Arc::new(FakeRuntime::new());
        let orch = orchestrator(&fake);

        for (tool, args) in [
            ("sherlock-maigret", json!({})),
            ("sherlock-maigret", json!({"username": 7})),
            ("spiderfoot", json!({"domain": "example.com"})),
            ("spiderfoot", Value::Null),
        ] {
            let err = orch.execute(tool, &args).await.unwrap_err();
            assert!(matches!(err, ToolError::InvalidParameters { .. }), "{tool}: {err}");
        }
        assert_eq!(fake.counts(), Counts::default());
    }

    #[tokio::test]
    async fn test_sherlock_with_image_present() {
        let fake = Arc::new(FakeRuntime::new().exiting(0, "[+] GitHub: https://github.com/john_doe"));
        let output = orchestrator(&fake)
            .execute("sherlock-maigret", &json!({"username": "john_doe"}))
            .await
            .unwrap();

        assert_eq!(output, "[+] GitHub: https://github.com/john_doe");
        assert_eq!(
            fake.counts(),
            Counts {
                image_checks: 1,
                pulls: 0,
                created: 1,
                runs: 1,
                removed: 1,
            }
        );
        let specs = fake.specs();
        assert_eq!(specs[0].argv, vec!["john_doe", "--no-color"]);
        assert_eq!(specs[0].image.to_string(), "sherlockproject/sherlock:latest");
    }

    #[tokio::test]
    async fn test_missing_image_is_pulled_first() {
        let fake = Arc::new(FakeRuntime::new().missing_image());
        orchestrator(&fake)
            .execute("spiderfoot", &json!({"target": "example.com"}))
            .await
            .unwrap();

        let counts = fake.counts();
        assert_eq!(counts.pulls, 1);
        assert_eq!(counts.runs, 1);
        assert_eq!(counts.removed, 1);
    }

    #[tokio::test]
    async fn test_pull_failure_creates_nothing() {
        let fake = Arc::new(FakeRuntime::new().failing_pull());
        let err = orchestrator(&fake)
            .execute("spiderfoot", &json!({"target": "example.com"}))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::ImageUnavailable { .. }));
        assert_eq!(fake.counts().created, 0);
        assert_eq!(fake.counts().removed, 0);
    }

    #[tokio::test]
    async fn test_non_zero_exit_still_removes_container() {
        let fake = Arc::new(FakeRuntime::new().exiting(1, "error: invalid site list"));
        let err = orchestrator(&fake)
            .execute("sherlock-maigret", &json!({"username": "john_doe"}))
            .await
            .unwrap_err();

        match err {
            ToolError::NonZeroExit { code, output, .. } => {
                assert_eq!(code, 1);
                assert_eq!(output, "error: invalid site list");
            }
            other => panic!("expected NonZeroExit, got {:?}", other),
        }
        assert_eq!(fake.counts().runs, 1);
        assert_eq!(fake.counts().removed, 1);
    }

    #[tokio::test]
    async fn test_non_zero_exit_output_is_bounded() {
        let fake = Arc::new(FakeRuntime::new().exiting(2, "e".repeat(9000)));
        let err = orchestrator(&fake)
            .execute("sherlock-maigret", &json!({"username": "john_doe"}))
            .await
            .unwrap_err();

        let ToolError::NonZeroExit { output, .. } = err else {
            panic!("expected NonZeroExit");
        };
        assert!(output.ends_with(TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn test_runtime_failure_still_removes_container() {
        let fake = Arc::new(FakeRuntime::new().failing_run());
        let err = orchestrator(&fake)
            .execute("sherlock-maigret", &json!({"username": "john_doe"}))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::Sandbox { .. }));
        assert_eq!(fake.counts().runs, 1);
        assert_eq!(fake.counts().removed, 1);
    }

    #[tokio::test]
    async fn test_create_failure_has_nothing_to_remove() {
        let fake = Arc::new(FakeRuntime::new().failing_create());
        let err = orchestrator(&fake)
            .execute("sherlock-maigret", &json!({"username": "john_doe"}))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::Sandbox { .. }));
        assert_eq!(fake.counts().runs, 0);
        assert_eq!(fake.counts().removed, 0);
    }

    #[tokio::test]
    async fn test_cancelled_during_create_still_removes_container() {
        let fake = Arc::new(FakeRuntime::new().with_create_delay(Duration::from_millis(100)));
        let orch = orchestrator(&fake);
        let args = json!({"username": "john_doe"});
        let cancelled = tokio::time::timeout(
            Duration::from_millis(20),
            orch.execute("sherlock-maigret", &args),
        )
        .await;
        assert!(cancelled.is_err());

        for _ in 0..50 {
            if fake.counts().removed == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(fake.counts().created, 1);
        assert_eq!(fake.counts().removed, 1);
        assert_eq!(fake.counts().runs, 0);
    }

    #[tokio::test]
    async fn test_remove_failure_does_not_mask_result() {
        let fake = Arc::new(FakeRuntime::new().failing_remove().exiting(0, "found 3 accounts"));
        let output = orchestrator(&fake)
            .execute("sherlock-maigret", &json!({"username": "john_doe"}))
            .await
            .unwrap();
        assert_eq!(output, "found 3 accounts");
        assert_eq!(fake.counts().removed, 1);
    }

    #[tokio::test]
    async fn test_long_output_is_truncated() {
        let fake = Arc::new(FakeRuntime::new().exiting(0, "a".repeat(7000)));
        let output = orchestrator(&fake)
            .execute("sherlock-maigret", &json!({"username": "john_doe"}))
            .await
            .unwrap();

        assert_eq!(output, format!("{}{}", "a".repeat(5000), TRUNCATION_MARKER));
    }

    #[tokio::test]
    async fn test_run_timeout_removes_container() {
        let fake = Arc::new(FakeRuntime::new().hanging());
        let limits = ResourceLimits {
            run_timeout: Duration::from_millis(50),
            ..ResourceLimits::default()
        };
        let err = orchestrator_with(&fake, limits)
            .execute("sherlock-maigret", &json!({"username": "john_doe"}))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::Timeout { .. }));
        assert_eq!(fake.counts().removed, 1);
    }

    #[tokio::test]
    async fn test_concurrency_is_capped() {
        let fake = Arc::new(FakeRuntime::new().with_run_delay(Duration::from_millis(30)));
        let limits = ResourceLimits {
            max_concurrent: 1,
            ..ResourceLimits::default()
        };
        let orch = Arc::new(orchestrator_with(&fake, limits));

        let mut handles = Vec::new();
        for name in ["alice", "bob", "carol"] {
            let orch = Arc::clone(&orch);
            handles.push(tokio::spawn(async move {
                orch.execute("sherlock-maigret", &json!({"username": name})).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(fake.max_in_flight(), 1);
        assert_eq!(fake.counts().runs, 3);
        assert_eq!(fake.counts().removed, 3);
    }

    #[tokio::test]
    async fn test_execute_request_maps_fields() {
        let fake = Arc::new(FakeRuntime::new());
        let request = ExecutionRequest {
            tool_id: "spiderfoot".to_string(),
            args: json!({"target": "example.org"}),
        };
        orchestrator(&fake).execute_request(&request).await.unwrap();
        assert_eq!(fake.specs()[0].argv, vec!["-s", "example.org"]);
    }
}
