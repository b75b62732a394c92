//! Panic mode: acknowledge first, then alert and run the shutdown script.
//!
//! ```text
//! Idle ──trigger──▶ Accepted ──script ok──▶ ScriptSucceeded
//!                      │
//!                      └──script error──▶ ScriptFailed
//! ```
//!
//! A trigger while `Accepted` is acknowledged but starts nothing. A trigger
//! from any terminal state starts a new run.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;

use crate::gateway::command::CommandRunner;
use crate::notify::{Alert, Notifier};

/// Bound on the alert sent before the script runs, which may take the
/// network down.
const ALERT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanicState {
    Idle,
    Accepted,
    ScriptSucceeded,
    ScriptFailed,
}

pub struct PanicCoordinator {
    script: PathBuf,
    grace: Duration,
    runner: Arc<dyn CommandRunner>,
    notifier: Option<Arc<dyn Notifier>>,
    state: Mutex<PanicState>,
}

impl PanicCoordinator {
    pub fn new(
        script: PathBuf,
        grace: Duration,
        runner: Arc<dyn CommandRunner>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            script,
            grace,
            runner,
            notifier,
            state: Mutex::new(PanicState::Idle),
        }
    }

    pub fn state(&self) -> PanicState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a panic run in the background. Returns `false` when a run is
    /// already in flight and this trigger was coalesced into it.
    pub fn trigger(self: &Arc<Self>) -> bool {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state == PanicState::Accepted {
                tracing::warn!("Panic already in progress, trigger coalesced");
                return false;
            }
            *state = PanicState::Accepted;
        }

        tracing::warn!("PANIC MODE TRIGGERED");
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = this.run().await;
            *this.state.lock().unwrap_or_else(|e| e.into_inner()) = outcome;
        });
        true
    }

    async fn run(&self) -> PanicState {
        // Lets the 202 reach the caller before anything disruptive happens.
        tokio::time::sleep(self.grace).await;

        self.alert(&Alert::panic_activated()).await;

        let program = self.script.to_string_lossy();
        match self.runner.run(&program, &[]).await {
            Ok(output) => {
                if !output.stderr.is_empty() {
                    tracing::warn!(stderr = %output.stderr.trim(), "Panic script stderr");
                }
                tracing::info!(stdout = %output.stdout.trim(), "Panic script completed");
                PanicState::ScriptSucceeded
            }
            Err(e) => {
                tracing::error!(error = %e, "Panic script execution failed");
                self.alert(&Alert::panic_script_failed(&e.to_string())).await;
                PanicState::ScriptFailed
            }
        }
    }

    async fn alert(&self, alert: &Alert) {
        let Some(ref notifier) = self.notifier else {
            return;
        };
        match tokio::time::timeout(ALERT_TIMEOUT, notifier.send(alert)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Panic alert not delivered"),
            Err(_) => tracing::warn!("Panic alert timed out"),
        }
    }
}
