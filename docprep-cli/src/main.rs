//! Entry point for the `docprep` binary.

mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use docprep_config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    setup_tracing();

    let cli = Cli::parse();
    let config = AppConfig::load().context("failed to load configuration")?;

    match cli.command {
        Command::Consume { workers } => commands::run_consume(config, workers).await,
        Command::Produce { path, task_type, collection } => {
            commands::run_produce(config, &path, task_type, collection).await
        }
    }
}

/// `RUST_LOG` drives verbosity, defaulting to `info` when unset. Tracing
/// goes to stderr so stdout stays clean for any future machine-readable
/// command output.
fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
