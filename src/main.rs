use clap::Parser;

use toolgate::cli::{Cli, init_tracing, run_command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_format);
    run_command(cli.command).await
}
