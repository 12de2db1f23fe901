//! Change execution: typed dispatch from change operations to SQL.

use strata_changelog::{Change, ColumnDef};
use tracing::debug;

use crate::error::{MigrateResult, MigrationError};
use crate::store::{ChangeStore, SqlValue};

/// A rendered SQL statement with its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl SqlStatement {
    /// A statement with no parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// A statement with bound parameters.
    pub fn with_params(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Applies single change operations against a store.
///
/// Pure dispatch plus parameter validation: the executor never opens or
/// closes a transaction, and it knows nothing about the ledger.
pub struct ChangeExecutor<'a, S: ChangeStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ChangeStore + ?Sized> ChangeExecutor<'a, S> {
    /// Create an executor over the given store.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Render and execute one change.
    pub async fn apply(&self, change: &Change) -> MigrateResult<()> {
        let stmt = render_change(change)?;
        debug!(kind = change.kind(), sql = %stmt.sql, "applying change");
        self.store.execute(&stmt.sql, stmt.params).await?;
        Ok(())
    }
}

/// Render a change operation to a SQL statement.
///
/// Validates that required fields are present and non-empty, failing with
/// [`MigrationError::MalformedChange`] before the store is touched.
pub fn render_change(change: &Change) -> MigrateResult<SqlStatement> {
    match change {
        Change::CreateTable {
            table_name,
            columns,
        } => {
            let table = require(change, "tableName", table_name)?;
            if columns.is_empty() {
                return Err(malformed(change, "columns"));
            }
            let defs = columns
                .iter()
                .map(|col| column_definition(change, col))
                .collect::<MigrateResult<Vec<_>>>()?;
            Ok(SqlStatement::new(format!(
                "CREATE TABLE \"{}\" ({})",
                table,
                defs.join(", ")
            )))
        }

        Change::AddColumn { table_name, column } => {
            let table = require(change, "tableName", table_name)?;
            let def = column_definition(change, column)?;
            Ok(SqlStatement::new(format!(
                "ALTER TABLE \"{}\" ADD COLUMN {}",
                table, def
            )))
        }

        Change::DropColumn {
            table_name,
            column_name,
        } => {
            let table = require(change, "tableName", table_name)?;
            let column = require(change, "columnName", column_name)?;
            Ok(SqlStatement::new(format!(
                "ALTER TABLE \"{}\" DROP COLUMN \"{}\"",
                table, column
            )))
        }

        Change::RenameColumn {
            table_name,
            old_column_name,
            new_column_name,
        } => {
            let table = require(change, "tableName", table_name)?;
            let old = require(change, "oldColumnName", old_column_name)?;
            let new = require(change, "newColumnName", new_column_name)?;
            Ok(SqlStatement::new(format!(
                "ALTER TABLE \"{}\" RENAME COLUMN \"{}\" TO \"{}\"",
                table, old, new
            )))
        }

        Change::CreateIndex {
            index_name,
            table_name,
            columns,
        } => {
            let index = require(change, "indexName", index_name)?;
            let table = require(change, "tableName", table_name)?;
            if columns.is_empty() {
                return Err(malformed(change, "columns"));
            }
            let cols: Vec<String> = columns
                .iter()
                .map(|c| format!("\"{}\"", c.name))
                .collect();
            Ok(SqlStatement::new(format!(
                "CREATE INDEX \"{}\" ON \"{}\" ({})",
                index,
                table,
                cols.join(", ")
            )))
        }

        Change::DropTable { table_name } => {
            let table = require(change, "tableName", table_name)?;
            Ok(SqlStatement::new(format!(
                "DROP TABLE IF EXISTS \"{}\"",
                table
            )))
        }

        Change::RawSql { sql } => {
            let sql = require(change, "sql", sql)?;
            Ok(SqlStatement::new(sql))
        }

        Change::InsertRow {
            table_name,
            columns,
        } => {
            let table = require(change, "tableName", table_name)?;
            if columns.is_empty() {
                return Err(malformed(change, "columns"));
            }
            let names: Vec<String> = columns.keys().map(|c| format!("\"{}\"", c)).collect();
            let placeholders: Vec<String> =
                (1..=columns.len()).map(|i| format!("?{}", i)).collect();
            let params: Vec<SqlValue> = columns.values().map(SqlValue::from).collect();
            Ok(SqlStatement::with_params(
                format!(
                    "INSERT INTO \"{}\" ({}) VALUES ({})",
                    table,
                    names.join(", "),
                    placeholders.join(", ")
                ),
                params,
            ))
        }
    }
}

/// Render a column definition.
///
/// Modifier ordering is a contract the target grammar depends on:
/// type, then PRIMARY KEY, AUTOINCREMENT, NOT NULL, UNIQUE, DEFAULT.
fn column_definition(change: &Change, col: &ColumnDef) -> MigrateResult<String> {
    let name = require(change, "name", &col.name)?;
    let col_type = require(change, "type", &col.column_type)?;

    let mut parts = vec![format!("\"{}\"", name), col_type];

    if col.constraints.primary_key {
        parts.push("PRIMARY KEY".to_string());
    }
    if col.constraints.auto_increment {
        parts.push("AUTOINCREMENT".to_string());
    }
    if col.constraints.nullable == Some(false) {
        parts.push("NOT NULL".to_string());
    }
    if col.constraints.unique {
        parts.push("UNIQUE".to_string());
    }
    if let Some(default) = &col.default_value {
        parts.push(format!("DEFAULT {}", render_default(default)));
    }

    Ok(parts.join(" "))
}

/// Render a default value as the document wrote it.
///
/// Strings pass through verbatim so documents can write SQL expressions like
/// `CURRENT_TIMESTAMP` or quoted literals; booleans lower to SQLite's 1/0.
fn render_default(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn require(change: &Change, field: &'static str, value: &str) -> MigrateResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(malformed(change, field))
    } else {
        Ok(trimmed.to_string())
    }
}

fn malformed(change: &Change, field: &'static str) -> MigrationError {
    MigrationError::MalformedChange {
        kind: change.kind(),
        field,
    }
}
