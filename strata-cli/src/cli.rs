//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Strata - changelog-driven schema migrations
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(version)]
#[command(about = "Strata - changelog-driven schema migrations", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the target database file
    #[arg(long, global = true, env = "STRATA_DB", default_value = "strata.db")]
    pub db: PathBuf,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply all pending change sets from a changelog
    Update(UpdateArgs),

    /// Roll back the most recently applied change sets
    Rollback(RollbackArgs),

    /// Show applied change sets
    Status,

    /// Show detailed ledger history, most recent first
    History,

    /// Tag the most recently applied change set
    Tag(TagArgs),

    /// Check that the ledger is reachable and well-formed
    Validate,

    /// Wipe the ledger (dangerous: schema objects are left in place)
    Clear(ClearArgs),

    /// Write a sample changelog file
    Generate(GenerateArgs),
}

/// Arguments for the `update` command
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Path to the changelog document (.yaml, .yml, or .json)
    pub changelog: PathBuf,
}

/// Arguments for the `rollback` command
#[derive(Args, Debug)]
pub struct RollbackArgs {
    /// Path to the changelog document (.yaml, .yml, or .json)
    pub changelog: PathBuf,

    /// How many change sets to roll back
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: usize,
}

/// Arguments for the `tag` command
#[derive(Args, Debug)]
pub struct TagArgs {
    /// Tag name to record on the latest ledger entry
    pub name: String,
}

/// Arguments for the `clear` command
#[derive(Args, Debug)]
pub struct ClearArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for the `generate` command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Where to write the sample changelog
    #[arg(default_value = "changelog.yaml")]
    pub filename: PathBuf,

    /// Overwrite an existing file
    #[arg(short, long)]
    pub force: bool,
}
