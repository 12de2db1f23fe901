//! SQLite-backed lock manager.

use std::time::Duration;

use chrono::Utc;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;
use tracing::{debug, warn};

use strata_migrate::{LockAttempt, LockManager, MigrateResult, MigrationError};

use crate::store::SqliteStore;
use crate::types::{fmt_timestamp, parse_timestamp};

/// The singleton `changelog_lock` row as a [`LockManager`].
///
/// Acquisition is a single conditional UPDATE, so the free→held transition is
/// atomic across every process sharing the database file; there is no window
/// between observing the lock free and taking it.
#[derive(Clone)]
pub struct SqliteLockManager {
    conn: Connection,
}

impl SqliteLockManager {
    /// Create a lock manager over the store's connection.
    pub fn new(store: &SqliteStore) -> Self {
        Self {
            conn: store.connection(),
        }
    }
}

fn store_error(err: tokio_rusqlite::Error) -> MigrationError {
    MigrationError::store(err.to_string())
}

#[async_trait::async_trait]
impl LockManager for SqliteLockManager {
    async fn try_acquire(
        &self,
        holder: &str,
        stale_after: Duration,
    ) -> MigrateResult<LockAttempt> {
        let now = Utc::now();
        let cutoff = now - chrono::Duration::from_std(stale_after).unwrap_or_default();
        let now_text = fmt_timestamp(now);
        let cutoff_text = fmt_timestamp(cutoff);
        let holder_owned = holder.to_string();

        let (previous, updated) = self
            .conn
            .call(move |conn| {
                // Read the current state first, for reporting only; the
                // acquisition decision is the conditional UPDATE below.
                let previous: Option<(i64, Option<String>, Option<String>)> = conn
                    .query_row(
                        "SELECT locked, granted_at, holder FROM changelog_lock WHERE id = 1",
                        [],
                        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                    )
                    .optional()?;

                let updated = conn.execute(
                    "UPDATE changelog_lock \
                     SET locked = 1, granted_at = ?1, holder = ?2 \
                     WHERE id = 1 AND (locked = 0 OR granted_at < ?3)",
                    rusqlite::params![now_text, holder_owned, cutoff_text],
                )?;

                Ok((previous, updated))
            })
            .await
            .map_err(store_error)?;

        let Some((was_locked, granted_at, previous_holder)) = previous else {
            return Err(MigrationError::store(
                "changelog_lock row missing; initialize the store first",
            ));
        };

        if updated == 1 {
            if was_locked != 0 {
                warn!(
                    previous_holder = previous_holder.as_deref().unwrap_or("unknown"),
                    granted_at = granted_at.as_deref().unwrap_or("unknown"),
                    "stale migration lock overridden"
                );
            }
            debug!(%holder, "lock acquired");
            return Ok(LockAttempt::Acquired);
        }

        Ok(LockAttempt::Held {
            holder: previous_holder.unwrap_or_else(|| "unknown".to_string()),
            granted_at: granted_at.and_then(|s| parse_timestamp(&s).ok()),
        })
    }

    async fn release(&self, holder: &str) -> MigrateResult<()> {
        let holder_owned = holder.to_string();
        let updated = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    "UPDATE changelog_lock \
                     SET locked = 0, granted_at = NULL, holder = NULL \
                     WHERE id = 1 AND locked = 1 AND holder = ?1",
                    [&holder_owned],
                )?)
            })
            .await
            .map_err(store_error)?;

        if updated == 0 {
            return Err(MigrationError::LockNotHeldByCaller {
                holder: holder.to_string(),
            });
        }
        debug!(%holder, "lock released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::SqliteLedger;
    use strata_migrate::Ledger;

    const STALE: Duration = Duration::from_secs(300);

    async fn lock_manager() -> (SqliteStore, SqliteLockManager) {
        let store = SqliteStore::open_in_memory().await.unwrap();
        SqliteLedger::new(&store).initialize().await.unwrap();
        let lock = SqliteLockManager::new(&store);
        (store, lock)
    }

    #[tokio::test]
    async fn test_only_one_holder_acquires() {
        let (_store, lock) = lock_manager().await;

        assert_eq!(
            lock.try_acquire("alpha", STALE).await.unwrap(),
            LockAttempt::Acquired
        );

        match lock.try_acquire("beta", STALE).await.unwrap() {
            LockAttempt::Held { holder, granted_at } => {
                assert_eq!(holder, "alpha");
                assert!(granted_at.is_some());
            }
            LockAttempt::Acquired => panic!("second acquirer must not succeed"),
        }
    }

    #[tokio::test]
    async fn test_release_requires_matching_holder() {
        let (_store, lock) = lock_manager().await;
        lock.try_acquire("alpha", STALE).await.unwrap();

        assert_eq!(
            lock.release("beta").await.unwrap_err(),
            MigrationError::LockNotHeldByCaller {
                holder: "beta".to_string(),
            }
        );

        lock.release("alpha").await.unwrap();
        assert_eq!(
            lock.try_acquire("beta", STALE).await.unwrap(),
            LockAttempt::Acquired
        );
    }

    #[tokio::test]
    async fn test_release_without_lock_fails() {
        let (_store, lock) = lock_manager().await;
        assert!(matches!(
            lock.release("nobody").await.unwrap_err(),
            MigrationError::LockNotHeldByCaller { .. }
        ));
    }

    #[tokio::test]
    async fn test_stale_lock_can_be_taken_over() {
        let (store, lock) = lock_manager().await;

        // Backdate a held lock well past any staleness threshold.
        let ancient = fmt_timestamp(Utc::now() - chrono::Duration::hours(3));
        store
            .connection()
            .call(move |conn| {
                conn.execute(
                    "UPDATE changelog_lock SET locked = 1, granted_at = ?1, holder = 'crashed' \
                     WHERE id = 1",
                    [&ancient],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(
            lock.try_acquire("rescuer", Duration::from_secs(60))
                .await
                .unwrap(),
            LockAttempt::Acquired
        );

        // A fresh lock with the same threshold is not stealable.
        assert!(matches!(
            lock.try_acquire("latecomer", Duration::from_secs(60))
                .await
                .unwrap(),
            LockAttempt::Held { .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_lock_row_is_store_error() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        // Create the table but not the singleton row.
        store
            .connection()
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TABLE changelog_lock (\
                     id INTEGER PRIMARY KEY CHECK (id = 1), \
                     locked INTEGER NOT NULL DEFAULT 0, \
                     granted_at TEXT, holder TEXT)",
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let lock = SqliteLockManager::new(&store);
        assert!(matches!(
            lock.try_acquire("alpha", STALE).await.unwrap_err(),
            MigrationError::Store(_)
        ));
    }
}
