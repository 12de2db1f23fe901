//! `strata rollback` - reverse the most recently applied change sets.

use std::path::Path;

use strata_changelog::load_changelog;

use crate::cli::RollbackArgs;
use crate::commands;
use crate::error::{CliError, CliResult};
use crate::output;

/// Run the rollback command
pub async fn run(db: &Path, args: RollbackArgs) -> CliResult<()> {
    output::header("Rollback");
    output::kv("Database", &db.display().to_string());
    output::kv("Changelog", &args.changelog.display().to_string());
    output::kv("Count", &args.count.to_string());
    output::newline();

    let change_sets = load_changelog(&args.changelog).await?;
    let engine = commands::engine(db).await?;
    let report = engine.rollback(&change_sets, args.count).await?;

    for id in &report.rolled_back {
        output::success(&format!("Rolled back change set {}", id));
    }

    if let Some(failure) = &report.failure {
        output::newline();
        return Err(CliError::Command(format!(
            "change set '{}' failed: {} ({})",
            failure.id,
            failure.error,
            report.summary()
        )));
    }

    output::newline();
    output::success(&report.summary());
    Ok(())
}
