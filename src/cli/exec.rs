//! `toolgate exec`: run one tool without the HTTP layer.

use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;

use crate::config::OrchestratorConfig;
use crate::orchestrator::{ExecutionResult, Orchestrator};
use crate::sandbox::DockerRuntime;
use crate::tools::ToolRegistry;

/// Parse `--args` into a JSON object.
fn parse_args(raw: &str) -> anyhow::Result<Value> {
    let value: Value = serde_json::from_str(raw).context("--args must be valid JSON")?;
    if !value.is_object() {
        anyhow::bail!("--args must be a JSON object, got {}", raw);
    }
    Ok(value)
}

pub async fn run_exec_command(tool_id: &str, raw_args: &str) -> anyhow::Result<()> {
    let args = parse_args(raw_args)?;
    let config = OrchestratorConfig::from_env()?;
    let runtime = DockerRuntime::connect(config.docker_socket.as_deref())
        .context("connecting to the Docker daemon")?;
    let orchestrator = Orchestrator::new(
        Arc::new(runtime),
        Arc::new(ToolRegistry::builtin()),
        config.limits,
    );

    let result = match orchestrator.execute(tool_id, &args).await {
        Ok(output) => ExecutionResult::ok(output),
        Err(e) => ExecutionResult::failure(e.to_string()),
    };
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        anyhow::bail!("tool '{}' failed", tool_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args_object() {
        let args = parse_args(r#"{"username":"john_doe"}"#).unwrap();
        assert_eq!(args["username"], "john_doe");
    }

    #[test]
    fn test_parse_args_rejects_non_objects() {
        assert!(parse_args("not json").is_err());
        assert!(parse_args(r#"["john_doe"]"#).is_err());
        assert!(parse_args("null").is_err());
    }
}
