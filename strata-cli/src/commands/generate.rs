//! `strata generate` - write a sample changelog.

use strata_changelog::sample_changelog_yaml;

use crate::cli::GenerateArgs;
use crate::error::{CliError, CliResult};
use crate::output;

/// Run the generate command
pub async fn run(args: GenerateArgs) -> CliResult<()> {
    if args.filename.exists() && !args.force {
        return Err(CliError::Command(format!(
            "'{}' already exists (use --force to overwrite)",
            args.filename.display()
        )));
    }

    tokio::fs::write(&args.filename, sample_changelog_yaml()).await?;

    output::success(&format!(
        "Generated sample changelog: {}",
        args.filename.display()
    ));
    output::list_item("Edit it, then apply with `strata update <changelog>`");
    Ok(())
}
