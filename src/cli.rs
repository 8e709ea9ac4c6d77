//! Command-line interface definition for the Dilemma Machine
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to run the HTTP service and to inspect statistics.

use clap::{Parser, Subcommand};

/// Dilemma Machine - two-option dilemma game backend
///
/// Records player choices per session and reports how the rest of the
/// players decided.
#[derive(Parser, Debug, Clone)]
#[command(name = "dilemma-machine")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit JSON-formatted logs
    #[arg(long)]
    pub json_logs: bool,

    /// Override the SQLite database path
    #[arg(long)]
    pub database: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP service
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Show aggregate statistics for a dilemma
    Stats {
        /// Dilemma identifier
        dilemma_id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show per-dilemma statistics for a session without completing it
    Summary {
        /// Session identifier
        session_id: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
