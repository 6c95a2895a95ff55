//! Status command - record counts and recent imports

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output;

/// Imports listed under the counts
const RECENT_IMPORTS: usize = 5;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let status = ctx.status_service.get_status(RECENT_IMPORTS)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("{}", "Treehouse Status".bold());
    println!("{}", status.database.dimmed());
    println!();

    let mut table = output::create_table();
    for count in &status.entity_counts {
        table.add_row(vec![format!("{}s", count.entity), count.count.to_string()]);
    }
    println!("{}", table);

    if status.recent_imports.is_empty() {
        return Ok(());
    }

    println!();
    println!("{}", "Recent Imports".bold());
    let mut imports = output::create_table();
    imports.set_header(vec!["ID", "Type", "Status", "Rows", "OK", "Failed", "Started"]);
    for import in &status.recent_imports {
        imports.add_row(vec![
            import.id.clone(),
            import.import_type.to_string(),
            output::status_label(import.status),
            import.total_rows.to_string(),
            import.successful.to_string(),
            import.failed.to_string(),
            output::format_time(import.started_at),
        ]);
    }
    println!("{}", imports);

    Ok(())
}
