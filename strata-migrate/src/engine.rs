//! Migration engine implementation.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use strata_changelog::{Change, ChangeSet};
use tracing::{debug, info, warn};

use crate::error::{MigrateResult, MigrationError};
use crate::executor::ChangeExecutor;
use crate::ledger::{Ledger, LedgerEntry, NewLedgerEntry};
use crate::lock::{LockAttempt, LockManager};
use crate::store::ChangeStore;

/// Configuration for the migration engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Opaque identifier recorded as the lock holder for this engine's runs.
    pub holder_id: String,
    /// How long `update`/`rollback` wait for the lock before giving up.
    pub lock_timeout: Duration,
    /// Delay between acquisition attempts while waiting.
    pub lock_poll_interval: Duration,
    /// Age past which a held lock is considered abandoned and may be
    /// force-cleared by the next acquirer.
    pub lock_stale_after: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            holder_id: uuid::Uuid::new_v4().to_string(),
            lock_timeout: Duration::from_secs(10),
            lock_poll_interval: Duration::from_millis(250),
            lock_stale_after: Duration::from_secs(300),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the lock holder identifier.
    pub fn holder_id(mut self, holder_id: impl Into<String>) -> Self {
        self.holder_id = holder_id.into();
        self
    }

    /// Set the lock acquisition timeout.
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Set the delay between lock acquisition attempts.
    pub fn lock_poll_interval(mut self, interval: Duration) -> Self {
        self.lock_poll_interval = interval;
        self
    }

    /// Set the staleness threshold for abandoned locks.
    pub fn lock_stale_after(mut self, stale_after: Duration) -> Self {
        self.lock_stale_after = stale_after;
        self
    }
}

/// A change set that failed, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSetFailure {
    /// Id of the failing change set.
    pub id: String,
    /// The failure.
    pub error: MigrationError,
}

impl std::fmt::Display for ChangeSetFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "change set '{}': {}", self.id, self.error)
    }
}

/// Result of an `update` run.
///
/// Prior successes in a partially failed run remain committed: each change
/// set is its own atomic unit, so failure is change-set-granular, never
/// run-granular.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    /// Ids applied by this run, in application order.
    pub applied: Vec<String>,
    /// Ids skipped because they were already in the ledger.
    pub skipped: Vec<String>,
    /// The change set that stopped the run, if any.
    pub failure: Option<ChangeSetFailure>,
}

impl UpdateReport {
    /// Check whether the run completed without failure.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Get a summary of the result.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if !self.applied.is_empty() {
            parts.push(format!("{} applied", self.applied.len()));
        }
        if !self.skipped.is_empty() {
            parts.push(format!("{} skipped", self.skipped.len()));
        }
        if let Some(failure) = &self.failure {
            parts.push(format!("failed at '{}'", failure.id));
        }

        if parts.is_empty() {
            "nothing to apply".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Result of a `rollback` run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollbackReport {
    /// Ids rolled back by this run, most recent first.
    pub rolled_back: Vec<String>,
    /// The entry that stopped the run, if any.
    pub failure: Option<ChangeSetFailure>,
}

impl RollbackReport {
    /// Check whether the run completed without failure.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Get a summary of the result.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if !self.rolled_back.is_empty() {
            parts.push(format!("{} rolled back", self.rolled_back.len()));
        }
        if let Some(failure) = &self.failure {
            parts.push(format!("failed at '{}'", failure.id));
        }

        if parts.is_empty() {
            "nothing to roll back".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// The main migration engine.
///
/// Orchestrates one run at a time: acquires the store-backed lock, diffs the
/// supplied document against the ledger, drives each change set through an
/// atomic unit, records the outcome, and releases the lock on every exit
/// path. All state lives in the store handles passed at construction; the
/// engine holds no ambient connection state.
pub struct MigrationEngine<S, L, K>
where
    S: ChangeStore,
    L: Ledger,
    K: LockManager,
{
    store: S,
    ledger: L,
    lock: K,
    config: EngineConfig,
}

impl<S, L, K> MigrationEngine<S, L, K>
where
    S: ChangeStore,
    L: Ledger,
    K: LockManager,
{
    /// Create a new engine with default configuration.
    pub fn new(store: S, ledger: L, lock: K) -> Self {
        Self::with_config(store, ledger, lock, EngineConfig::default())
    }

    /// Create a new engine with the given configuration.
    pub fn with_config(store: S, ledger: L, lock: K, config: EngineConfig) -> Self {
        Self {
            store,
            ledger,
            lock,
            config,
        }
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Initialize the backing storage (ledger and lock tables).
    pub async fn initialize(&self) -> MigrateResult<()> {
        self.ledger.initialize().await
    }

    /// Apply every pending change set from the supplied document.
    ///
    /// Pending change sets are applied strictly in document order. The run
    /// stops at the first failing change set; everything applied before it
    /// stays applied and recorded.
    pub async fn update(
        &self,
        change_sets: &[ChangeSet],
        source_document: &str,
    ) -> MigrateResult<UpdateReport> {
        self.acquire_lock().await?;
        let outcome = self.update_locked(change_sets, source_document).await;
        self.release_lock().await;
        outcome
    }

    async fn update_locked(
        &self,
        change_sets: &[ChangeSet],
        source_document: &str,
    ) -> MigrateResult<UpdateReport> {
        let applied = self.ledger.list_applied().await?;
        let applied_ids: HashSet<&str> = applied.iter().map(|e| e.id.as_str()).collect();

        let mut report = UpdateReport::default();

        for change_set in change_sets {
            if applied_ids.contains(change_set.id.as_str()) {
                debug!(id = %change_set.id, "change set already applied, skipping");
                report.skipped.push(change_set.id.clone());
                continue;
            }

            match self.apply_operations(&change_set.operations).await {
                Ok(()) => {
                    self.ledger
                        .append(NewLedgerEntry::executed(change_set, source_document))
                        .await?;
                    info!(id = %change_set.id, author = %change_set.author, "change set applied");
                    report.applied.push(change_set.id.clone());
                }
                Err(error) => {
                    warn!(id = %change_set.id, %error, "change set failed, stopping run");
                    report.failure = Some(ChangeSetFailure {
                        id: change_set.id.clone(),
                        error,
                    });
                    break;
                }
            }
        }

        Ok(report)
    }

    /// Reverse the `count` most recently applied change sets.
    ///
    /// Targets follow the ledger's `execution_order` descending, regardless
    /// of document order. Each entry must be present in the supplied
    /// document, match its recorded fingerprint, and define rollback
    /// operations; the run stops at the first entry that does not.
    pub async fn rollback(
        &self,
        change_sets: &[ChangeSet],
        count: usize,
    ) -> MigrateResult<RollbackReport> {
        self.acquire_lock().await?;
        let outcome = self.rollback_locked(change_sets, count).await;
        self.release_lock().await;
        outcome
    }

    async fn rollback_locked(
        &self,
        change_sets: &[ChangeSet],
        count: usize,
    ) -> MigrateResult<RollbackReport> {
        let applied = self.ledger.list_applied().await?;
        let by_id: HashMap<&str, &ChangeSet> =
            change_sets.iter().map(|cs| (cs.id.as_str(), cs)).collect();

        let mut report = RollbackReport::default();

        for entry in applied.iter().rev().take(count) {
            if let Err(error) = self.rollback_entry(entry, &by_id).await {
                warn!(id = %entry.id, %error, "rollback stopped");
                report.failure = Some(ChangeSetFailure {
                    id: entry.id.clone(),
                    error,
                });
                break;
            }
            info!(id = %entry.id, "change set rolled back");
            report.rolled_back.push(entry.id.clone());
        }

        Ok(report)
    }

    async fn rollback_entry(
        &self,
        entry: &LedgerEntry,
        by_id: &HashMap<&str, &ChangeSet>,
    ) -> MigrateResult<()> {
        let change_set = by_id
            .get(entry.id.as_str())
            .ok_or_else(|| MigrationError::RollbackDefinitionMissing(entry.id.clone()))?;

        // A definition that changed since it was applied may no longer match
        // what its rollback steps assume; refuse rather than guess.
        if change_set.fingerprint != entry.fingerprint {
            return Err(MigrationError::DriftDetected {
                id: entry.id.clone(),
                expected: entry.fingerprint.clone(),
                actual: change_set.fingerprint.clone(),
            });
        }

        if change_set.rollback_operations.is_empty() {
            return Err(MigrationError::NoRollbackDefined(entry.id.clone()));
        }

        self.apply_operations(&change_set.rollback_operations)
            .await?;
        self.ledger.remove(&entry.id).await
    }

    /// Apply a sequence of operations as one atomic unit.
    async fn apply_operations(&self, operations: &[Change]) -> MigrateResult<()> {
        self.store.begin().await?;

        let executor = ChangeExecutor::new(&self.store);
        for change in operations {
            if let Err(error) = executor.apply(change).await {
                if let Err(abort_error) = self.store.rollback().await {
                    warn!(%abort_error, "failed to abandon transaction");
                }
                return Err(error);
            }
        }

        self.store.commit().await
    }

    /// All applied ledger entries, ascending by execution order (read-only).
    pub async fn status(&self) -> MigrateResult<Vec<LedgerEntry>> {
        self.ledger.list_applied().await
    }

    /// Tag the most recently applied change set, returning its id.
    pub async fn tag(&self, tag_name: &str) -> MigrateResult<String> {
        let id = self.ledger.tag(tag_name).await?;
        info!(%tag_name, %id, "tagged ledger head");
        Ok(id)
    }

    /// Destructive full ledger wipe. Callers gate this behind confirmation.
    pub async fn clear(&self) -> MigrateResult<()> {
        self.ledger.clear().await?;
        warn!("ledger cleared");
        Ok(())
    }

    /// Check that the ledger is reachable and well-formed; returns the entry
    /// count.
    pub async fn validate(&self) -> MigrateResult<usize> {
        self.ledger.count().await
    }

    async fn acquire_lock(&self) -> MigrateResult<()> {
        let deadline = tokio::time::Instant::now() + self.config.lock_timeout;

        loop {
            let attempt = self
                .lock
                .try_acquire(&self.config.holder_id, self.config.lock_stale_after)
                .await?;

            match attempt {
                LockAttempt::Acquired => {
                    debug!(holder = %self.config.holder_id, "lock acquired");
                    return Ok(());
                }
                LockAttempt::Held { holder, granted_at } => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(MigrationError::LockAcquisitionFailed { holder, granted_at });
                    }
                    tokio::time::sleep(self.config.lock_poll_interval).await;
                }
            }
        }
    }

    /// Release the lock unconditionally; a failed run must never leave the
    /// system wedged, so release errors are logged rather than propagated
    /// over the run's own outcome.
    async fn release_lock(&self) {
        if let Err(error) = self.lock.release(&self.config.holder_id).await {
            warn!(holder = %self.config.holder_id, %error, "failed to release lock");
        }
    }
}
