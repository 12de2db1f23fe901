//! # strata-sqlite
//!
//! SQLite storage adapter for the Strata migration engine.
//!
//! Implements the engine's three storage traits over a single
//! `tokio-rusqlite` connection:
//! - [`SqliteStore`]: statement execution and transaction boundaries
//! - [`SqliteLedger`]: the `changelog` table
//! - [`SqliteLockManager`]: the singleton `changelog_lock` row
//!
//! All three share one underlying connection (the handle is cheaply
//! cloneable), so a run's ledger writes and schema changes land on the same
//! database the lock row lives in.

pub mod ledger;
pub mod lock;
pub mod store;
mod types;

// Re-exports
pub use ledger::SqliteLedger;
pub use lock::SqliteLockManager;
pub use store::SqliteStore;

use strata_migrate::{EngineConfig, MigrateResult, MigrationEngine};

/// A migration engine assembled over SQLite storage.
pub type SqliteMigrationEngine = MigrationEngine<SqliteStore, SqliteLedger, SqliteLockManager>;

/// Open a database file and assemble an engine over it.
pub async fn open_engine(path: impl AsRef<std::path::Path>) -> MigrateResult<SqliteMigrationEngine> {
    open_engine_with_config(path, EngineConfig::default()).await
}

/// Open a database file and assemble an engine with the given configuration.
pub async fn open_engine_with_config(
    path: impl AsRef<std::path::Path>,
    config: EngineConfig,
) -> MigrateResult<SqliteMigrationEngine> {
    let store = SqliteStore::open(path).await?;
    let ledger = SqliteLedger::new(&store);
    let lock = SqliteLockManager::new(&store);
    Ok(MigrationEngine::with_config(store, ledger, lock, config))
}
