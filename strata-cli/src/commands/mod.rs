//! Command implementations.

pub mod clear;
pub mod generate;
pub mod history;
pub mod rollback;
pub mod status;
pub mod tag;
pub mod update;
pub mod validate;

use std::path::Path;

use strata_sqlite::{SqliteMigrationEngine, open_engine};

use crate::error::CliResult;

/// Open the database and assemble an initialized engine over it.
pub(crate) async fn engine(db: &Path) -> CliResult<SqliteMigrationEngine> {
    let engine = open_engine(db).await?;
    engine.initialize().await?;
    Ok(engine)
}
