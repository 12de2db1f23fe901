//! `strata history` - detailed ledger history, most recent first.

use std::path::Path;

use crate::commands;
use crate::error::CliResult;
use crate::output;

/// Run the history command
pub async fn run(db: &Path) -> CliResult<()> {
    output::header("History");

    let engine = commands::engine(db).await?;
    let mut entries = engine.status().await?;

    if entries.is_empty() {
        output::info("No ledger history found.");
        return Ok(());
    }

    entries.reverse();

    for entry in &entries {
        output::kv("Id", &entry.id);
        output::kv("Author", &entry.author);
        output::kv("Source", &entry.source_document);
        output::kv("Executed", &entry.executed_at.to_rfc3339());
        output::kv("Order", &entry.execution_order.to_string());
        output::kv("Type", entry.execution_type.as_str());
        output::kv("Fingerprint", &entry.fingerprint);
        if !entry.description.is_empty() {
            output::kv("Description", &entry.description);
        }
        if let Some(tag) = &entry.tag {
            output::kv("Tag", tag);
        }
        output::newline();
    }

    Ok(())
}
