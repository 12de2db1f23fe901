//! SQLite store wrapper.

use std::path::Path;

use tokio_rusqlite::Connection;
use tracing::debug;

use strata_migrate::{ChangeStore, MigrateResult, MigrationError, SqlValue};

use crate::types::to_sqlite_value;

/// A SQLite-backed [`ChangeStore`].
///
/// Wraps a single `tokio-rusqlite` connection; clones share the same
/// underlying connection thread, so statements across clones serialize in
/// call order.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file.
    pub async fn open(path: impl AsRef<Path>) -> MigrateResult<Self> {
        let conn = Connection::open(path.as_ref())
            .await
            .map_err(|e| MigrationError::store(e.to_string()))?;
        Self::configure(conn).await
    }

    /// Open an in-memory database.
    pub async fn open_in_memory() -> MigrateResult<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| MigrationError::store(e.to_string()))?;
        Self::configure(conn).await
    }

    async fn configure(conn: Connection) -> MigrateResult<Self> {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA busy_timeout = 5000;\n\
                 PRAGMA foreign_keys = ON;",
            )?;
            Ok(())
        })
        .await
        .map_err(|e| MigrationError::store(e.to_string()))?;
        Ok(Self { conn })
    }

    /// The shared connection handle, for the ledger and lock manager.
    pub(crate) fn connection(&self) -> Connection {
        self.conn.clone()
    }
}

#[async_trait::async_trait]
impl ChangeStore for SqliteStore {
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> MigrateResult<usize> {
        let sql = sql.to_string();
        debug!(sql = %sql, "executing statement");

        self.conn
            .call(move |conn| {
                let params: Vec<rusqlite::types::Value> =
                    params.into_iter().map(to_sqlite_value).collect();
                let refs: Vec<&dyn rusqlite::ToSql> =
                    params.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
                Ok(conn.execute(&sql, refs.as_slice())?)
            })
            .await
            .map_err(|e| MigrationError::execution(e.to_string()))
    }

    async fn begin(&self) -> MigrateResult<()> {
        debug!("begin transaction");
        self.conn
            .call(|conn| Ok(conn.execute_batch("BEGIN IMMEDIATE")?))
            .await
            .map_err(|e| MigrationError::store(e.to_string()))
    }

    async fn commit(&self) -> MigrateResult<()> {
        debug!("commit transaction");
        self.conn
            .call(|conn| Ok(conn.execute_batch("COMMIT")?))
            .await
            .map_err(|e| MigrationError::store(e.to_string()))
    }

    async fn rollback(&self) -> MigrateResult<()> {
        debug!("rollback transaction");
        self.conn
            .call(|conn| Ok(conn.execute_batch("ROLLBACK")?))
            .await
            .map_err(|e| MigrationError::store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_with_params() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store
            .execute("CREATE TABLE t (name TEXT, n INTEGER)", vec![])
            .await
            .unwrap();

        let affected = store
            .execute(
                "INSERT INTO t (name, n) VALUES (?1, ?2)",
                vec![SqlValue::Text("alice".to_string()), SqlValue::Integer(3)],
            )
            .await
            .unwrap();
        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn test_rejected_statement_is_execution_error() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let err = store
            .execute("INSERT INTO missing (x) VALUES (1)", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::Execution { .. }));
    }

    #[tokio::test]
    async fn test_transaction_rollback_discards_effects() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        store.begin().await.unwrap();
        store
            .execute("CREATE TABLE t (x INTEGER)", vec![])
            .await
            .unwrap();
        store.rollback().await.unwrap();

        // The table never existed as far as later statements can tell.
        let err = store
            .execute("INSERT INTO t (x) VALUES (1)", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::Execution { .. }));
    }
}
