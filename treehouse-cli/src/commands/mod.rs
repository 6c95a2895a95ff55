//! CLI command implementations

pub mod import;
pub mod logs;
pub mod status;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use treehouse_core::{EntryPoint, LogEvent, LoggingService, TreehouseContext};

/// Get the audit logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let treehouse_dir = get_treehouse_dir().ok()?;
    std::fs::create_dir_all(&treehouse_dir).ok()?;
    match LoggingService::new(&treehouse_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")) {
        Ok(logger) => Some(logger),
        Err(e) => {
            tracing::debug!(error = %e, "Audit log unavailable");
            None
        }
    }
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        if let Err(e) = l.log(event) {
            tracing::debug!(error = %e, "Failed to write audit event");
        }
    }
}

/// Treehouse directory from `TREEHOUSE_DIR`, or `~/.treehouse`
pub fn get_treehouse_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TREEHOUSE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".treehouse"))
        .ok_or_else(|| anyhow!("Could not find home directory; set TREEHOUSE_DIR"))
}

/// Open the treehouse context, creating the directory if needed
pub fn get_context() -> Result<TreehouseContext> {
    let treehouse_dir = get_treehouse_dir()?;

    std::fs::create_dir_all(&treehouse_dir).with_context(|| {
        format!(
            "Failed to create treehouse directory: {}",
            treehouse_dir.display()
        )
    })?;

    TreehouseContext::new(&treehouse_dir).context("Failed to initialize treehouse context")
}
