//! Error types for the migration engine.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur during migration operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MigrationError {
    /// Another engine instance holds the lock and the acquire timeout ran out.
    #[error("migration lock is held by '{holder}' (granted at {})",
        granted_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "unknown".to_string()))]
    LockAcquisitionFailed {
        /// Identifier of the current holder.
        holder: String,
        /// When the current holder acquired the lock.
        granted_at: Option<DateTime<Utc>>,
    },

    /// A release was attempted by a caller that does not hold the lock.
    #[error("migration lock is not held by '{holder}'")]
    LockNotHeldByCaller {
        /// Identifier that attempted the release.
        holder: String,
    },

    /// A ledger entry with this id already exists.
    #[error("change set '{0}' is already recorded in the ledger")]
    DuplicateId(String),

    /// No ledger entry with this id exists.
    #[error("change set '{0}' is not recorded in the ledger")]
    NotFound(String),

    /// A tag was requested but the ledger is empty.
    #[error("no applied change sets to tag")]
    NoAppliedMigrations,

    /// A change operation is missing or has an empty required field.
    #[error("malformed '{kind}' change: missing or empty field '{field}'")]
    MalformedChange {
        /// Document tag of the change kind.
        kind: &'static str,
        /// The offending field, in its document spelling.
        field: &'static str,
    },

    /// A change kind the executor does not understand.
    ///
    /// Dispatch over [`strata_changelog::Change`] is exhaustive, so this is
    /// produced at document-parse boundaries rather than inside the engine.
    #[error("unsupported change kind '{0}'")]
    UnsupportedChangeKind(String),

    /// The underlying store rejected a statement.
    #[error("execution failed: {cause}")]
    Execution {
        /// Human-readable cause from the store.
        cause: String,
    },

    /// The store itself is unreachable or misbehaving (connection, schema).
    #[error("store error: {0}")]
    Store(String),

    /// Rollback was requested for an applied change set that is absent from
    /// the supplied document.
    #[error("cannot roll back '{0}': change set not present in the supplied changelog")]
    RollbackDefinitionMissing(String),

    /// The supplied change set's fingerprint no longer matches the one
    /// recorded when it was applied.
    #[error("drift detected for '{id}': recorded fingerprint {expected}, document has {actual}")]
    DriftDetected {
        /// Change set id.
        id: String,
        /// Fingerprint recorded in the ledger.
        expected: String,
        /// Fingerprint of the supplied definition.
        actual: String,
    },

    /// Rollback was requested for a change set with no rollback operations.
    #[error("change set '{0}' defines no rollback operations")]
    NoRollbackDefined(String),
}

impl MigrationError {
    /// Create an execution error.
    pub fn execution(cause: impl Into<String>) -> Self {
        Self::Execution {
            cause: cause.into(),
        }
    }

    /// Create a store error.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Check whether this failure stops a run before any mutation.
    pub fn is_lock_failure(&self) -> bool {
        matches!(
            self,
            Self::LockAcquisitionFailed { .. } | Self::LockNotHeldByCaller { .. }
        )
    }
}
