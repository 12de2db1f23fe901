//! `strata validate` - ledger sanity check.

use std::path::Path;

use crate::commands;
use crate::error::CliResult;
use crate::output;

/// Run the validate command
pub async fn run(db: &Path) -> CliResult<()> {
    let engine = commands::engine(db).await?;
    let count = engine.validate().await?;

    output::success(&format!(
        "Ledger is valid ({} change set(s) recorded)",
        count
    ));
    Ok(())
}
