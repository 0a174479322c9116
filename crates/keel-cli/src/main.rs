//! Keel CLI - Cash-flow forecasting and gray-charge detection
//!
//! Usage:
//!   keel serve --port 4000    Start the API server
//!   keel probe                Check provider and insight backend health

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Serve {
            host,
            port,
            allow_origin,
        } => commands::cmd_serve(&host, port, allow_origin).await,
        Commands::Probe => commands::cmd_probe().await,
    }
}
