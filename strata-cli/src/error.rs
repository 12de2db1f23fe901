//! CLI error types and result alias.

use miette::Diagnostic;
use thiserror::Error;

use strata_changelog::ChangelogError;
use strata_migrate::MigrationError;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(strata::io))]
    Io(#[from] std::io::Error),

    /// Changelog document error
    #[error("Changelog error: {0}")]
    #[diagnostic(code(strata::changelog))]
    Changelog(#[from] ChangelogError),

    /// Migration engine error
    #[error("Migration error: {0}")]
    #[diagnostic(code(strata::migration))]
    Migration(#[from] MigrationError),

    /// Command-level error
    #[error("{0}")]
    #[diagnostic(code(strata::command))]
    Command(String),
}
