//! Logs command - view and manage the import audit log

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use treehouse_core::{EntryPoint, LoggingService};

use super::get_treehouse_dir;
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent audit entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear old audit entries
    Clear {
        /// Delete entries older than N days
        #[arg(long, default_value = "30")]
        older_than_days: u64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show audit log statistics and database path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn get_logging_service() -> Result<LoggingService> {
    let treehouse_dir = get_treehouse_dir()?;
    std::fs::create_dir_all(&treehouse_dir)
        .with_context(|| format!("Failed to create {}", treehouse_dir.display()))?;
    LoggingService::new(&treehouse_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(output::format_time)
        .unwrap_or_else(|| timestamp_ms.to_string())
}

pub fn run(command: LogsCommands) -> Result<()> {
    match command {
        LogsCommands::List {
            limit,
            errors,
            json,
        } => {
            let service = get_logging_service()?;
            let entries = if errors {
                service.get_errors(limit)?
            } else {
                service.get_recent(limit)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
                return Ok(());
            }

            if entries.is_empty() {
                println!("No audit entries found.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Time", "Event", "Actor", "Type", "Import", "Details"]);

            for entry in entries {
                let details = match &entry.error_message {
                    Some(err) => err.red().to_string(),
                    None => entry.details.clone().unwrap_or_default(),
                };
                table.add_row(vec![
                    format_timestamp(entry.timestamp),
                    entry.event,
                    entry.actor.unwrap_or_default(),
                    entry.import_type.unwrap_or_default(),
                    entry.import_id.unwrap_or_default(),
                    details,
                ]);
            }

            println!("{}", table);
        }
        LogsCommands::Clear {
            older_than_days,
            force,
            json,
        } => {
            let service = get_logging_service()?;
            let cutoff_ms = treehouse_core::services::logging::now_ms()
                - (older_than_days as i64 * 24 * 60 * 60 * 1000);

            if !force
                && !json
                && !Confirm::new()
                    .with_prompt(format!(
                        "Delete audit entries older than {} days?",
                        older_than_days
                    ))
                    .default(false)
                    .interact()?
            {
                println!("Cancelled.");
                return Ok(());
            }

            let deleted = service.delete_before(cutoff_ms)?;

            if json {
                println!("{}", serde_json::json!({"deleted": deleted}));
            } else {
                println!("Deleted {} audit entries", deleted);
            }
        }
        LogsCommands::Stats { json } => {
            let service = get_logging_service()?;
            let total = service.count()?;
            let by_event = service.event_counts()?;
            let db_path = service.db_path().to_path_buf();
            let size_bytes = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

            if json {
                let events: serde_json::Map<String, serde_json::Value> = by_event
                    .into_iter()
                    .map(|(event, n)| (event, serde_json::Value::from(n)))
                    .collect();
                println!(
                    "{}",
                    serde_json::json!({
                        "totalEntries": total,
                        "events": events,
                        "databasePath": db_path.to_string_lossy(),
                        "databaseSizeBytes": size_bytes
                    })
                );
            } else {
                println!("{}", "Audit Log".bold());
                println!("  Total entries: {}", total);
                for (event, n) in &by_event {
                    println!("  {}: {}", event, n);
                }
                println!("  Database: {}", db_path.display());
                println!("  Size: {}", output::format_size(size_bytes));
            }
        }
    }

    Ok(())
}
