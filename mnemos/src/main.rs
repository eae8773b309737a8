//! mnemos - Tiered memory CLI
//!
//! Hosts a memory coordinator for one command run: loads the configuration,
//! feeds it content, runs maintenance ticks and reports what was kept.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod commands;
mod config;
mod error;
mod input;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("mnemos=info".parse()?))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let (config, source) = config::load(cli.config.as_deref())?;
    tracing::debug!(source = %source, "Configuration loaded");

    // Execute command
    match cli.command {
        Commands::Stats(cmd) => commands::stats::execute(cmd, config).await,
        Commands::Ingest(cmd) => commands::ingest::execute(cmd, config).await,
        Commands::Query(cmd) => commands::query::execute(cmd, config).await,
        Commands::Simulate(cmd) => commands::simulate::execute(cmd, config).await,
        Commands::Config(cmd) => commands::config::execute(cmd, &config, &source),
    }
}
