//! The ledger: a durable, ordered record of applied change sets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strata_changelog::ChangeSet;

use crate::error::MigrateResult;

/// How a ledger entry came to be recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionType {
    /// Applied normally.
    Executed,
    /// Re-applied after an accepted definition change. Reserved; the engine
    /// does not currently produce it.
    Reran,
}

impl ExecutionType {
    /// Stable storage spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionType::Executed => "EXECUTED",
            ExecutionType::Reran => "RERAN",
        }
    }
}

impl std::str::FromStr for ExecutionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EXECUTED" => Ok(ExecutionType::Executed),
            "RERAN" => Ok(ExecutionType::Reran),
            other => Err(format!("unknown execution type '{}'", other)),
        }
    }
}

impl std::fmt::Display for ExecutionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted record of one applied change set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Change set id (primary key).
    pub id: String,
    /// Author attribution.
    pub author: String,
    /// Provenance of the document that supplied the change set.
    pub source_document: String,
    /// When the change set was applied.
    pub executed_at: DateTime<Utc>,
    /// Strictly increasing application order; gaps are permitted after
    /// rollbacks. Rollback targeting follows this, never `executed_at`.
    pub execution_order: i64,
    /// How the entry was recorded.
    pub execution_type: ExecutionType,
    /// Fingerprint of the change set as applied.
    pub fingerprint: String,
    /// Human-readable description.
    pub description: String,
    /// Tag applied by an explicit tagging operation, if any.
    pub tag: Option<String>,
}

/// The caller-supplied part of a new ledger entry.
///
/// `executed_at` and `execution_order` are assigned by the ledger at append
/// time, atomically with the insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub id: String,
    pub author: String,
    pub source_document: String,
    pub execution_type: ExecutionType,
    pub fingerprint: String,
    pub description: String,
}

impl NewLedgerEntry {
    /// Build the record for a change set applied from the given document.
    pub fn executed(change_set: &ChangeSet, source_document: impl Into<String>) -> Self {
        Self {
            id: change_set.id.clone(),
            author: change_set.author.clone(),
            source_document: source_document.into(),
            execution_type: ExecutionType::Executed,
            fingerprint: change_set.fingerprint.clone(),
            description: change_set.description.clone(),
        }
    }
}

/// Durable, ordered record of applied change sets.
///
/// Append-only except for explicit rollback removal and tag annotation. The
/// ledger is the single source of truth for "what has been applied": the
/// engine never infers state by probing schema objects.
#[async_trait::async_trait]
pub trait Ledger: Send + Sync {
    /// Create the ledger's backing storage if it does not exist (idempotent).
    async fn initialize(&self) -> MigrateResult<()>;

    /// All applied entries, ascending by `execution_order`.
    async fn list_applied(&self) -> MigrateResult<Vec<LedgerEntry>>;

    /// Look up a single entry by change set id.
    async fn find_by_id(&self, id: &str) -> MigrateResult<Option<LedgerEntry>>;

    /// Record a newly applied change set.
    ///
    /// Assigns `execution_order = max(existing) + 1` atomically with the
    /// insert; fails with [`MigrationError::DuplicateId`] if the id is
    /// already present.
    ///
    /// [`MigrationError::DuplicateId`]: crate::error::MigrationError::DuplicateId
    async fn append(&self, entry: NewLedgerEntry) -> MigrateResult<LedgerEntry>;

    /// Delete the entry for a rolled-back change set.
    ///
    /// Remaining entries keep their `execution_order`; gaps are fine.
    async fn remove(&self, id: &str) -> MigrateResult<()>;

    /// Tag the most recently applied entry, returning its id.
    async fn tag(&self, tag_name: &str) -> MigrateResult<String>;

    /// Destructive full wipe of the ledger.
    async fn clear(&self) -> MigrateResult<()>;

    /// Number of recorded entries; also serves as a reachability probe.
    async fn count(&self) -> MigrateResult<usize>;
}
