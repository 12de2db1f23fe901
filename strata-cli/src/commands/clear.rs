//! `strata clear` - wipe the ledger.

use std::path::Path;

use crate::cli::ClearArgs;
use crate::commands;
use crate::error::CliResult;
use crate::output;

/// Run the clear command
pub async fn run(db: &Path, args: ClearArgs) -> CliResult<()> {
    output::warn("This wipes all ledger history; schema objects are left in place.");

    if !args.yes && !output::confirm("Clear the ledger?") {
        output::info("Aborted.");
        return Ok(());
    }

    let engine = commands::engine(db).await?;
    engine.clear().await?;

    output::success("Ledger cleared.");
    Ok(())
}
