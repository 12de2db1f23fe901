//! # strata-migrate
//!
//! Migration engine for Strata.
//!
//! This crate provides:
//! - The [`MigrationEngine`] orchestrator: pending computation, per-change-set
//!   atomic application, rollback of the most recently applied change sets,
//!   and drift detection against recorded fingerprints
//! - The [`Ledger`] trait: a durable, ordered record of applied change sets
//! - The [`LockManager`] trait: a store-backed mutual-exclusion row so only
//!   one engine instance mutates at a time across processes sharing a store
//! - The change executor: typed dispatch from [`Change`] operations to SQL
//!   statements against a [`ChangeStore`]
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐     ┌──────────────────┐     ┌──────────────┐
//! │ Change sets   │────▶│ Migration Engine │────▶│ Change Exec  │
//! │ (parsed doc)  │     └──────────────────┘     └──────────────┘
//! └───────────────┘        │            │               │
//!                          ▼            ▼               ▼
//!                   ┌────────────┐ ┌──────────┐  ┌─────────────┐
//!                   │ Lock row   │ │ Ledger   │  │ ChangeStore │
//!                   └────────────┘ └──────────┘  └─────────────┘
//! ```
//!
//! The engine acquires the lock, diffs the supplied document against the
//! ledger, applies each pending change set inside its own store transaction,
//! records it, and releases the lock on every exit path. Rollback walks the
//! ledger in reverse execution order and verifies each entry's fingerprint
//! against the supplied document before reversing it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_migrate::{EngineConfig, MigrationEngine};
//!
//! async fn run() -> strata_migrate::MigrateResult<()> {
//!     let change_sets = strata_changelog::load_changelog("changelog.yaml").await?;
//!
//!     let engine = MigrationEngine::new(store, ledger, lock_manager);
//!     engine.initialize().await?;
//!
//!     let report = engine.update(&change_sets, "changelog.yaml").await?;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod lock;
pub mod store;

// Re-exports
pub use engine::{
    ChangeSetFailure, EngineConfig, MigrationEngine, RollbackReport, UpdateReport,
};
pub use error::{MigrateResult, MigrationError};
pub use executor::{ChangeExecutor, SqlStatement, render_change};
pub use ledger::{ExecutionType, Ledger, LedgerEntry, NewLedgerEntry};
pub use lock::{LockAttempt, LockManager};
pub use store::{ChangeStore, SqlValue};

pub use strata_changelog::{Change, ChangeSet};
