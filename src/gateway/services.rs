//! Allow-listed service lifecycle control.

use std::sync::Arc;

use serde::Serialize;

use crate::error::RelayError;
use crate::gateway::command::CommandRunner;
use crate::safety::{CharClass, ServiceAction, ServiceAllowlist, sanitize};

/// Successful `serviceAction` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceOutcome {
    pub message: String,
    pub output: String,
}

/// Runs `<cli> <action> <service>` for allow-listed pairs only.
pub struct ServiceController {
    cli: String,
    services: ServiceAllowlist,
    runner: Arc<dyn CommandRunner>,
}

impl ServiceController {
    pub fn new(
        cli: impl Into<String>,
        services: ServiceAllowlist,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        Self {
            cli: cli.into(),
            services,
            runner,
        }
    }

    /// Validate and perform `action` on `service`.
    ///
    /// Both inputs are checked against their allow-lists before anything
    /// is spawned.
    pub async fn perform(&self, action: &str, service: &str) -> Result<ServiceOutcome, RelayError> {
        let action: ServiceAction = action.parse().map_err(|_| RelayError::InvalidAction {
            action: action.to_string(),
        })?;
        if !self.services.contains(service) {
            return Err(RelayError::InvalidService {
                service: service.to_string(),
            });
        }

        let args = vec![
            sanitize(action.as_str(), CharClass::Alphabetic),
            sanitize(service, CharClass::Identifier),
        ];
        tracing::info!(action = %action, service = %service, "Service action requested");

        let output = self.runner.run(&self.cli, &args).await?;
        if !output.stderr.is_empty() {
            tracing::debug!(service = %service, stderr = %output.stderr.trim(), "Service command stderr");
        }

        Ok(ServiceOutcome {
            message: format!("Service {} {} successfully.", service, action.past_tense()),
            output: output.stdout,
        })
    }
}
