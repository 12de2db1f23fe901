//! `strata tag` - tag the most recently applied change set.

use std::path::Path;

use crate::cli::TagArgs;
use crate::commands;
use crate::error::CliResult;
use crate::output;

/// Run the tag command
pub async fn run(db: &Path, args: TagArgs) -> CliResult<()> {
    let engine = commands::engine(db).await?;
    let id = engine.tag(&args.name).await?;

    output::success(&format!("Tagged change set '{}' as '{}'", id, args.name));
    Ok(())
}
