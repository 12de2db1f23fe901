//! `strata update` - apply pending change sets.

use std::path::Path;

use strata_changelog::load_changelog;

use crate::cli::UpdateArgs;
use crate::commands;
use crate::error::{CliError, CliResult};
use crate::output;

/// Run the update command
pub async fn run(db: &Path, args: UpdateArgs) -> CliResult<()> {
    output::header("Update");
    output::kv("Database", &db.display().to_string());
    output::kv("Changelog", &args.changelog.display().to_string());
    output::newline();

    let change_sets = load_changelog(&args.changelog).await?;
    if change_sets.is_empty() {
        output::info("Changelog contains no change sets.");
        return Ok(());
    }

    let engine = commands::engine(db).await?;
    let source = args.changelog.display().to_string();
    let report = engine.update(&change_sets, &source).await?;

    for id in &report.applied {
        output::success(&format!("Applied change set {}", id));
    }
    if !report.skipped.is_empty() {
        output::info(&format!(
            "{} change set(s) already applied",
            report.skipped.len()
        ));
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
    if report.applied.is_empty() {
        output::success("Database is up to date.");
    } else {
        output::success(&report.summary());
    }

    Ok(())
}
