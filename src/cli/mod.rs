//! CLI command handling.
//!
//! Provides subcommands for:
//! - Serving the tool orchestrator (`orchestrator`)
//! - Serving the public gateway and privileged relay (`gateway`)
//! - Running one tool locally (`exec`)
//! - Listing registered tools (`tools`)
//! - Probing running services (`status`)

mod exec;
mod serve;
pub mod status;
mod tools;

pub use exec::run_exec_command;
pub use serve::{run_gateway, run_orchestrator};
pub use status::run_status_command;
pub use tools::run_tools_command;

use std::net::SocketAddr;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use url::Url;

const DEFAULT_LOG_FILTER: &str = "toolgate=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "toolgate")]
#[command(about = "Sandboxed OSINT tool execution with a privileged service-control relay")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log output format
    #[arg(
        long,
        global = true,
        value_enum,
        env = "TOOLGATE_LOG_FORMAT",
        default_value = "pretty"
    )]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the tool orchestrator (POST /execute, GET /tools, GET /health)
    Orchestrator {
        /// Bind address (overrides ORCHESTRATOR_BIND)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Serve the public gateway and the privileged operations relay
    Gateway {
        /// Bind address (overrides GATEWAY_BIND)
        #[arg(long)]
        bind: Option<SocketAddr>,
    },

    /// Run one tool through a local orchestrator and print the result
    Exec {
        /// Tool identifier, e.g. sherlock-maigret
        tool_id: String,

        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },

    /// List registered tools
    Tools {
        /// Print the full listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Probe the health of a running gateway and orchestrator
    Status {
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        gateway: Url,

        #[arg(long, default_value = "http://127.0.0.1:4000")]
        orchestrator: Url,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter.
pub fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);
    let _ = match format {
        LogFormat::Pretty => builder.with_target(false).try_init(),
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
    };
}

/// Dispatch a parsed command.
pub async fn run_command(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Orchestrator { bind } => run_orchestrator(bind).await,
        Command::Gateway { bind } => run_gateway(bind).await,
        Command::Exec { tool_id, args } => run_exec_command(&tool_id, &args).await,
        Command::Tools { json } => run_tools_command(json),
        Command::Status {
            gateway,
            orchestrator,
        } => run_status_command(&gateway, &orchestrator).await,
    }
}
