//! SQLite-backed ledger.

use chrono::Utc;
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;
use tracing::debug;

use strata_migrate::{
    ExecutionType, Ledger, LedgerEntry, MigrateResult, MigrationError, NewLedgerEntry,
};

use crate::store::SqliteStore;
use crate::types::{fmt_timestamp, parse_timestamp};

/// DDL for the ledger and lock tables.
pub const INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS changelog (
    id TEXT PRIMARY KEY,
    author TEXT NOT NULL,
    source_document TEXT NOT NULL,
    executed_at TEXT NOT NULL,
    execution_order INTEGER NOT NULL UNIQUE,
    execution_type TEXT NOT NULL,
    fingerprint TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    tag TEXT
);

CREATE TABLE IF NOT EXISTS changelog_lock (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    locked INTEGER NOT NULL DEFAULT 0,
    granted_at TEXT,
    holder TEXT
);

INSERT OR IGNORE INTO changelog_lock (id, locked) VALUES (1, 0);
"#;

/// The `changelog` table as a [`Ledger`].
#[derive(Clone)]
pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    /// Create a ledger over the store's connection.
    pub fn new(store: &SqliteStore) -> Self {
        Self {
            conn: store.connection(),
        }
    }
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let executed_at: String = row.get("executed_at")?;
    let execution_type: String = row.get("execution_type")?;

    Ok(LedgerEntry {
        id: row.get("id")?,
        author: row.get("author")?,
        source_document: row.get("source_document")?,
        executed_at: parse_timestamp(&executed_at).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?,
        execution_order: row.get("execution_order")?,
        execution_type: execution_type.parse::<ExecutionType>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, e.into())
        })?,
        fingerprint: row.get("fingerprint")?,
        description: row.get("description")?,
        tag: row.get("tag")?,
    })
}

fn store_error(err: tokio_rusqlite::Error) -> MigrationError {
    MigrationError::store(err.to_string())
}

const SELECT_COLUMNS: &str = "id, author, source_document, executed_at, execution_order, \
                              execution_type, fingerprint, description, tag";

#[async_trait::async_trait]
impl Ledger for SqliteLedger {
    async fn initialize(&self) -> MigrateResult<()> {
        debug!("initializing changelog tables");
        self.conn
            .call(|conn| Ok(conn.execute_batch(INIT_SQL)?))
            .await
            .map_err(store_error)
    }

    async fn list_applied(&self) -> MigrateResult<Vec<LedgerEntry>> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM changelog ORDER BY execution_order ASC",
                    SELECT_COLUMNS
                ))?;
                let rows = stmt.query_map([], entry_from_row)?;
                let entries: Result<Vec<_>, _> = rows.collect();
                Ok(entries?)
            })
            .await
            .map_err(store_error)
    }

    async fn find_by_id(&self, id: &str) -> MigrateResult<Option<LedgerEntry>> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let entry = conn
                    .query_row(
                        &format!("SELECT {} FROM changelog WHERE id = ?1", SELECT_COLUMNS),
                        [&id],
                        entry_from_row,
                    )
                    .optional()?;
                Ok(entry)
            })
            .await
            .map_err(store_error)
    }

    async fn append(&self, entry: NewLedgerEntry) -> MigrateResult<LedgerEntry> {
        let executed_at = Utc::now();
        let id = entry.id.clone();

        let insert = entry.clone();
        let timestamp = fmt_timestamp(executed_at);
        let order = self
            .conn
            .call(move |conn| {
                // The order subquery runs inside the INSERT, so the max+1
                // assignment is atomic with the row itself.
                conn.execute(
                    "INSERT INTO changelog \
                     (id, author, source_document, executed_at, execution_order, \
                      execution_type, fingerprint, description, tag) \
                     VALUES (?1, ?2, ?3, ?4, \
                      (SELECT COALESCE(MAX(execution_order), 0) + 1 FROM changelog), \
                      ?5, ?6, ?7, NULL)",
                    rusqlite::params![
                        insert.id,
                        insert.author,
                        insert.source_document,
                        timestamp,
                        insert.execution_type.as_str(),
                        insert.fingerprint,
                        insert.description,
                    ],
                )?;
                let order: i64 = conn.query_row(
                    "SELECT execution_order FROM changelog WHERE id = ?1",
                    [&insert.id],
                    |row| row.get(0),
                )?;
                Ok(order)
            })
            .await
            .map_err(|e| map_append_error(&id, e))?;

        debug!(%id, order, "ledger entry appended");

        Ok(LedgerEntry {
            id: entry.id,
            author: entry.author,
            source_document: entry.source_document,
            executed_at,
            execution_order: order,
            execution_type: entry.execution_type,
            fingerprint: entry.fingerprint,
            description: entry.description,
            tag: None,
        })
    }

    async fn remove(&self, id: &str) -> MigrateResult<()> {
        let owned = id.to_string();
        let affected = self
            .conn
            .call(move |conn| Ok(conn.execute("DELETE FROM changelog WHERE id = ?1", [&owned])?))
            .await
            .map_err(store_error)?;

        if affected == 0 {
            return Err(MigrationError::NotFound(id.to_string()));
        }
        debug!(%id, "ledger entry removed");
        Ok(())
    }

    async fn tag(&self, tag_name: &str) -> MigrateResult<String> {
        let tag = tag_name.to_string();
        let tagged = self
            .conn
            .call(move |conn| {
                let updated = conn.execute(
                    "UPDATE changelog SET tag = ?1 \
                     WHERE execution_order = (SELECT MAX(execution_order) FROM changelog)",
                    [&tag],
                )?;
                if updated == 0 {
                    return Ok(None);
                }
                let id: String = conn.query_row(
                    "SELECT id FROM changelog ORDER BY execution_order DESC LIMIT 1",
                    [],
                    |row| row.get(0),
                )?;
                Ok(Some(id))
            })
            .await
            .map_err(store_error)?;

        tagged.ok_or(MigrationError::NoAppliedMigrations)
    }

    async fn clear(&self) -> MigrateResult<()> {
        self.conn
            .call(|conn| {
                conn.execute("DELETE FROM changelog", [])?;
                Ok(())
            })
            .await
            .map_err(store_error)
    }

    async fn count(&self) -> MigrateResult<usize> {
        self.conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM changelog", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(store_error)
    }
}

/// A constraint violation on the ledger's primary key means the change set is
/// already recorded.
fn map_append_error(id: &str, err: tokio_rusqlite::Error) -> MigrationError {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(code, _)) = &err {
        if code.code == rusqlite::ErrorCode::ConstraintViolation {
            return MigrationError::DuplicateId(id.to_string());
        }
    }
    MigrationError::store(err.to_string())
}
