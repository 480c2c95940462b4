mod cli;
mod commands;
mod credentials;
mod telemetry;

use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("❌ {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // values from .env act as env fallbacks for clap
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init(&cli.logging.to_config())?;
    tracing::debug!(target: "skiff::cli", command = ?cli.command, "dispatching");
    commands::dispatch(cli).await
}
