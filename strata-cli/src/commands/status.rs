//! `strata status` - show applied change sets.

use std::path::Path;

use crate::commands;
use crate::error::CliResult;
use crate::output;

/// Run the status command
pub async fn run(db: &Path) -> CliResult<()> {
    output::header("Status");
    output::kv("Database", &db.display().to_string());
    output::newline();

    let engine = commands::engine(db).await?;
    let entries = engine.status().await?;

    if entries.is_empty() {
        output::info("No change sets have been applied.");
        return Ok(());
    }

    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            vec![
                e.execution_order.to_string(),
                e.id.clone(),
                e.author.clone(),
                e.executed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                e.description.clone(),
                e.tag.clone().unwrap_or_default(),
            ]
        })
        .collect();

    output::table(
        &["ORDER", "ID", "AUTHOR", "EXECUTED AT", "DESCRIPTION", "TAG"],
        &rows,
    );

    output::newline();
    output::dim(&format!("{} change set(s) applied", entries.len()));
    Ok(())
}
