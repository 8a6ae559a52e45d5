//! CLI command definitions for the `huddle` binary.

pub mod status;

use clap::{Parser, Subcommand};

/// Session and identity store for the party game.
#[derive(Parser)]
#[command(name = "huddle", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "HUDDLE_LOG_JSON")]
    pub log_json: bool,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web channel HTTP server.
    Serve {
        /// Port to listen on (defaults to `http_port` from config.toml).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to `http_host` from config.toml).
        #[arg(long)]
        host: Option<String>,
    },

    /// Show store counts and schema version.
    Status,

    /// Open the database, apply pending schema upgrades and exit.
    Migrate,
}
