//! Import command - preview, run, roll back and inspect CSV imports

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use treehouse_core::services::{ImportService, PreviewResult};
use treehouse_core::{ImportHistory, ImportType, LogEvent};
use uuid::Uuid;

use super::{get_context, get_logger, log_event};
use crate::output;

/// Row errors shown before truncating the list
const MAX_ERRORS_SHOWN: usize = 20;

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Validate a CSV file without writing anything
    Preview {
        /// Path to CSV file
        file: PathBuf,
        /// Import type (members, checkouts, donations, programs, attendees, metrics)
        #[arg(long = "type", short = 't')]
        import_type: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Import a CSV file
    Run {
        /// Path to CSV file
        file: PathBuf,
        /// Import type (members, checkouts, donations, programs, attendees)
        #[arg(long = "type", short = 't')]
        import_type: String,
        /// User recorded as running the import
        #[arg(long, env = "TREEHOUSE_USER", default_value = "cli")]
        user: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every record an import created
    Rollback {
        /// Import ID
        import_id: String,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recent imports
    History {
        /// Number of imports to show (defaults to import.historyLimit)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one import with its errors
    Show {
        /// Import ID
        import_id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a CSV template for an import type
    Template {
        /// Import type
        import_type: String,
        /// Write to this file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

pub fn run(command: ImportCommands) -> Result<()> {
    match command {
        ImportCommands::Preview {
            file,
            import_type,
            json,
        } => run_preview(&file, &import_type, json),
        ImportCommands::Run {
            file,
            import_type,
            user,
            json,
        } => run_import(&file, &import_type, &user, json),
        ImportCommands::Rollback {
            import_id,
            force,
            json,
        } => run_rollback(&import_id, force, json),
        ImportCommands::History { limit, json } => run_history(limit, json),
        ImportCommands::Show { import_id, json } => run_show(&import_id, json),
        ImportCommands::Template {
            import_type,
            output,
        } => run_template(&import_type, output.as_deref()),
    }
}

fn parse_import_id(import_id: &str) -> Result<Uuid> {
    Uuid::parse_str(import_id.trim()).with_context(|| format!("Invalid import ID: {}", import_id))
}

/// Read a CSV file, refusing anything over the configured size limit
fn read_csv(path: &Path, max_bytes: u64) -> Result<String> {
    let size = std::fs::metadata(path)
        .with_context(|| format!("Failed to read {}", path.display()))?
        .len();
    if size > max_bytes {
        bail!(
            "{} is {}, larger than the {} import limit",
            path.display(),
            output::format_size(size),
            output::format_size(max_bytes)
        );
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|n| n.to_string_lossy().into_owned())
}

fn run_preview(file: &Path, import_type: &str, json: bool) -> Result<()> {
    let import_type: ImportType = import_type.parse()?;
    let ctx = get_context()?;
    let text = read_csv(file, ctx.config.import.max_file_bytes)?;

    let preview = ctx.import_service.preview(&text, import_type.as_str())?;

    let logger = get_logger();
    log_event(
        &logger,
        LogEvent::new("import_previewed")
            .with_import_type(import_type.as_str())
            .with_details(format!(
                "{} rows, {} valid, {} invalid",
                preview.total_rows, preview.valid_rows, preview.invalid_rows
            )),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
        return Ok(());
    }

    print_preview(&preview, import_type);
    Ok(())
}

fn print_preview(preview: &PreviewResult, import_type: ImportType) {
    println!("{}", format!("Preview: {} import", import_type).bold());
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Rows", &preview.total_rows.to_string()]);
    table.add_row(vec!["Valid", &preview.valid_rows.to_string()]);
    table.add_row(vec!["Invalid", &preview.invalid_rows.to_string()]);
    table.add_row(vec!["Columns", &preview.columns.join(", ")]);
    println!("{}", table);

    if !preview.sample.is_empty() {
        println!();
        println!("{}", "Sample".bold());
        let mut sample = output::create_table();
        sample.set_header(preview.columns.clone());
        for row in &preview.sample {
            sample.add_row(
                preview
                    .columns
                    .iter()
                    .map(|c| row.get(c).and_then(|v| v.as_str()).unwrap_or("").to_string())
                    .collect::<Vec<_>>(),
            );
        }
        println!("{}", sample);
    }

    if !preview.errors.is_empty() {
        println!();
        println!("{}", "Invalid rows".red().bold());
        let mut errors = output::create_table();
        errors.set_header(vec!["Row", "Errors"]);
        for err in preview.errors.iter().take(MAX_ERRORS_SHOWN) {
            errors.add_row(vec![err.row.to_string(), err.errors.join("; ")]);
        }
        println!("{}", errors);
        if preview.errors.len() > MAX_ERRORS_SHOWN {
            println!(
                "{}",
                format!("... and {} more", preview.errors.len() - MAX_ERRORS_SHOWN).dimmed()
            );
        }
    } else if preview.total_rows > 0 {
        println!();
        output::success("All rows are valid");
    }
}

fn run_import(file: &Path, import_type: &str, user: &str, json: bool) -> Result<()> {
    let import_type: ImportType = import_type.parse()?;
    let ctx = get_context()?;
    let text = read_csv(file, ctx.config.import.max_file_bytes)?;
    let logger = get_logger();

    let spinner = (!json).then(|| output::spinner(&format!("Importing {}...", import_type)));
    let result = ctx
        .import_service
        .execute(&text, import_type, user, file_name(file));
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    let history = match result {
        Ok(history) => history,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("import_failed")
                    .with_actor(user)
                    .with_import_type(import_type.as_str())
                    .with_error(e.to_string()),
            );
            return Err(e);
        }
    };

    log_event(
        &logger,
        LogEvent::new("import_executed")
            .with_actor(user)
            .with_import_type(import_type.as_str())
            .with_import_id(history.id)
            .with_details(format!(
                "{} rows, {} successful, {} failed",
                history.stats.total_rows, history.stats.successful, history.stats.failed
            )),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    print_history(&history);
    println!();
    if history.stats.failed == 0 {
        output::success(&format!(
            "Imported {} {} rows",
            history.stats.successful, import_type
        ));
    } else {
        output::warning(&format!(
            "Imported {} of {} rows; {} failed",
            history.stats.successful, history.stats.total_rows, history.stats.failed
        ));
    }
    println!(
        "{}",
        format!("Undo with: th import rollback {}", history.id).dimmed()
    );
    Ok(())
}

fn run_rollback(import_id: &str, force: bool, json: bool) -> Result<()> {
    let id = parse_import_id(import_id)?;
    let ctx = get_context()?;
    let logger = get_logger();

    if !force && !json {
        if let Some(history) = ctx.import_service.get_history(id)? {
            println!(
                "\n{}",
                format!(
                    "This will delete {} records created by the {} import of {}.",
                    history.imported_records.len(),
                    history.import_type,
                    output::format_time(history.started_at)
                )
                .yellow()
            );
            if !Confirm::new()
                .with_prompt("Are you sure?")
                .default(false)
                .interact()?
            {
                println!("{}\n", "Cancelled".dimmed());
                return Ok(());
            }
        }
    }

    let result = match ctx.import_service.rollback(id) {
        Ok(result) => result,
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("import_rolled_back")
                    .with_import_id(id)
                    .with_error(e.to_string()),
            );
            return Err(e);
        }
    };

    log_event(
        &logger,
        LogEvent::new("import_rolled_back")
            .with_import_id(id)
            .with_details(format!(
                "{} deleted, {} errors",
                result.deleted,
                result.errors.len()
            )),
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.errors.is_empty() {
        output::success(&format!("Rolled back import {}: {} records deleted", id, result.deleted));
    } else {
        output::warning(&format!(
            "Rolled back import {}: {} records deleted, {} could not be deleted",
            id,
            result.deleted,
            result.errors.len()
        ));
        let mut table = output::create_table();
        table.set_header(vec!["Model", "Record", "Error"]);
        for err in &result.errors {
            table.add_row(vec![
                err.model.to_string(),
                err.record_id.to_string(),
                err.error.clone(),
            ]);
        }
        println!("{}", table);
    }
    Ok(())
}

fn run_history(limit: Option<usize>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let limit = limit.unwrap_or(ctx.config.import.history_limit);
    let histories = ctx.import_service.list_history(limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&histories)?);
        return Ok(());
    }

    if histories.is_empty() {
        output::info("No imports yet.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec![
        "ID", "Type", "File", "Status", "Rows", "OK", "Failed", "Started", "By",
    ]);
    for h in histories {
        table.add_row(vec![
            h.id.to_string(),
            h.import_type.to_string(),
            h.file_name.clone().unwrap_or_default(),
            output::status_label(h.status),
            h.stats.total_rows.to_string(),
            h.stats.successful.to_string(),
            h.stats.failed.to_string(),
            output::format_time(h.started_at),
            h.imported_by.clone(),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn run_show(import_id: &str, json: bool) -> Result<()> {
    let id = parse_import_id(import_id)?;
    let ctx = get_context()?;
    let history = ctx
        .import_service
        .get_history(id)?
        .with_context(|| format!("Import {} not found", id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    print_history(&history);
    Ok(())
}

fn print_history(history: &ImportHistory) {
    let mut table = output::create_table();
    table.add_row(vec!["Import", &history.id.to_string()]);
    table.add_row(vec!["Type", history.import_type.as_str()]);
    table.add_row(vec!["Status", &output::status_label(history.status)]);
    table.add_row(vec!["File", history.file_name.as_deref().unwrap_or("-")]);
    table.add_row(vec!["By", &history.imported_by]);
    table.add_row(vec!["Started", &output::format_time(history.started_at)]);
    if let Some(done) = history.completed_at {
        table.add_row(vec!["Completed", &output::format_time(done)]);
    }
    table.add_row(vec!["Rows", &history.stats.total_rows.to_string()]);
    table.add_row(vec!["Successful", &history.stats.successful.to_string()]);
    table.add_row(vec!["Failed", &history.stats.failed.to_string()]);

    let mut created: BTreeMap<&str, usize> = BTreeMap::new();
    for record in &history.imported_records {
        *created.entry(record.model.as_str()).or_default() += 1;
    }
    if !created.is_empty() {
        let summary = created
            .iter()
            .map(|(model, n)| format!("{} {}", n, model))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec!["Created", &summary]);
    }
    println!("{}", table);

    if !history.errors.is_empty() {
        println!();
        println!("{}", "Errors".red().bold());
        let mut errors = output::create_table();
        errors.set_header(vec!["Row", "Error"]);
        for err in history.errors.iter().take(MAX_ERRORS_SHOWN) {
            errors.add_row(vec![err.row.to_string(), err.error.clone()]);
        }
        println!("{}", errors);
        if history.errors.len() > MAX_ERRORS_SHOWN {
            println!(
                "{}",
                format!("... and {} more", history.errors.len() - MAX_ERRORS_SHOWN).dimmed()
            );
        }
    }
}

fn run_template(import_type: &str, output_path: Option<&Path>) -> Result<()> {
    let import_type: ImportType = import_type.parse()?;
    let csv = ImportService::template_csv(import_type);

    match output_path {
        Some(path) => {
            std::fs::write(path, &csv)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            output::success(&format!(
                "Wrote {} template to {}",
                import_type,
                path.display()
            ));
        }
        None => print!("{}", csv),
    }
    Ok(())
}
