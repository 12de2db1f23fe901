//! Cross-process mutual exclusion through a store-backed lock row.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::MigrateResult;

/// Outcome of a single acquisition attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum LockAttempt {
    /// The caller now holds the lock.
    Acquired,
    /// Someone else holds the lock and it is not stale.
    Held {
        /// Identifier of the current holder.
        holder: String,
        /// When the current holder acquired the lock.
        granted_at: Option<DateTime<Utc>>,
    },
}

impl LockAttempt {
    /// True when the attempt acquired the lock.
    pub fn is_acquired(&self) -> bool {
        matches!(self, LockAttempt::Acquired)
    }
}

/// A mutual-exclusion primitive backed by a singleton row in the store.
///
/// Because the row lives in the same store the migrations target, every
/// process observing that store contends on the same lock regardless of
/// which machine it runs on. Implementations must make the free→held
/// transition a single atomic conditional write; a read followed by a
/// separate write leaves a race window between concurrent acquirers.
#[async_trait::async_trait]
pub trait LockManager: Send + Sync {
    /// Attempt to acquire the lock once.
    ///
    /// A lock whose `granted_at` is older than `stale_after` may be
    /// force-cleared and re-acquired (the holder is assumed crashed);
    /// implementations log such takeovers.
    async fn try_acquire(&self, holder: &str, stale_after: Duration)
    -> MigrateResult<LockAttempt>;

    /// Release the lock.
    ///
    /// Fails with [`MigrationError::LockNotHeldByCaller`] when `holder` does
    /// not match the current holder, so one run can never release another's
    /// lock.
    ///
    /// [`MigrationError::LockNotHeldByCaller`]: crate::error::MigrationError::LockNotHeldByCaller
    async fn release(&self, holder: &str) -> MigrateResult<()>;
}
