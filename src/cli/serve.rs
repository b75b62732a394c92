//! Long-running server commands.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use crate::config::{GatewayConfig, OrchestratorConfig};
use crate::gateway::{self, GatewayState};
use crate::orchestrator::{self, Orchestrator};
use crate::sandbox::DockerRuntime;
use crate::server::{HttpServer, shutdown_signal};
use crate::tools::ToolRegistry;

/// Serve the orchestrator until Ctrl-C or SIGTERM.
pub async fn run_orchestrator(bind: Option<SocketAddr>) -> anyhow::Result<()> {
    let mut config = OrchestratorConfig::from_env()?;
    if let Some(bind) = bind {
        config.bind = bind;
    }
    let config = Arc::new(config);

    let runtime = DockerRuntime::connect(config.docker_socket.as_deref())
        .context("connecting to the Docker daemon")?;
    if let Err(e) = runtime.ping().await {
        tracing::warn!(error = %e, "Docker daemon did not answer ping; executions will fail until it does");
    }

    let registry = Arc::new(ToolRegistry::builtin());
    tracing::info!(
        tools = registry.list().len(),
        max_concurrent = config.limits.max_concurrent,
        run_timeout_secs = config.limits.run_timeout.as_secs(),
        "Orchestrator configured"
    );
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(runtime),
        registry,
        config.limits.clone(),
    ));

    let mut server = HttpServer::new("orchestrator", config.bind);
    server.add_routes(orchestrator::api::router(orchestrator));
    server.start().await?;

    shutdown_signal().await;
    server.shutdown().await;
    Ok(())
}

/// Serve the gateway until Ctrl-C or SIGTERM.
pub async fn run_gateway(bind: Option<SocketAddr>) -> anyhow::Result<()> {
    let mut config = GatewayConfig::from_env()?;
    if let Some(bind) = bind {
        config.bind = bind;
    }
    let config = Arc::new(config);

    let state = Arc::new(GatewayState::from_config(&config)?);
    tracing::info!(
        orchestrator = %config.orchestrator_url,
        services = config.services.len(),
        notifier = config.has_notifier(),
        "Gateway configured"
    );
    if !config.has_notifier() {
        tracing::warn!("No alert notifier configured; /api/notify will answer 503");
    }

    let mut server = HttpServer::new("gateway", config.bind);
    server.add_routes(gateway::router(state, config.auth_token.clone()));
    server.start().await?;

    shutdown_signal().await;
    server.shutdown().await;
    Ok(())
}
