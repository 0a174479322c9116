//! CLI argument definitions using clap
//!
//! This module contains the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};

/// Keel - Project your cash flow and surface gray charges
#[derive(Parser)]
#[command(name = "keel")]
#[command(about = "Self-hosted cash-flow forecasting engine", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// Browser origin allowed to call the API (repeatable)
        #[arg(long)]
        allow_origin: Vec<String>,
    },

    /// Check provider and insight backend health
    Probe,
}
