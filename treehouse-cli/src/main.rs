//! Treehouse CLI - CSV data import for the Treehouse dashboard

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{import, logs, status};

/// Environment variable holding the tracing filter directive
const LOG_ENV: &str = "TREEHOUSE_LOG";

/// Treehouse - import members, checkouts, donations and programs from CSV
#[derive(Parser)]
#[command(name = "th", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preview, run, inspect and roll back CSV imports
    Import {
        #[command(subcommand)]
        command: import::ImportCommands,
    },

    /// Show record counts and recent imports
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// View and manage the audit log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Import { command } => import::run(command),
        Commands::Status { json } => status::run(json),
        Commands::Logs { command } => logs::run(command),
    }
}
