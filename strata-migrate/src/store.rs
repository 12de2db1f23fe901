//! The store boundary: a transactional SQL store the engine drives.

use crate::error::MigrateResult;

/// A parameter value bound into a SQL statement.
///
/// Deliberately smaller than a full SQL type system: change documents carry
/// JSON scalars, and this is exactly what those scalars lower to.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<&serde_json::Value> for SqlValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => SqlValue::Null,
            serde_json::Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Integer(i)
                } else {
                    SqlValue::Real(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => SqlValue::Text(s.clone()),
            // Nested structures are stored as their JSON text.
            other => SqlValue::Text(other.to_string()),
        }
    }
}

/// A transactional SQL store reachable through an execute interface.
///
/// The engine owns transaction boundaries: it brackets each change set's
/// operations between [`begin`](ChangeStore::begin) and
/// [`commit`](ChangeStore::commit)/[`rollback`](ChangeStore::rollback) so a
/// multi-operation change set applies all-or-nothing. The change executor
/// only ever calls [`execute`](ChangeStore::execute).
#[async_trait::async_trait]
pub trait ChangeStore: Send + Sync {
    /// Execute a single statement, returning the number of affected rows.
    async fn execute(&self, sql: &str, params: Vec<SqlValue>) -> MigrateResult<usize>;

    /// Open a transaction.
    async fn begin(&self) -> MigrateResult<()>;

    /// Commit the open transaction.
    async fn commit(&self) -> MigrateResult<()>;

    /// Abandon the open transaction; nothing executed since
    /// [`begin`](ChangeStore::begin) persists.
    async fn rollback(&self) -> MigrateResult<()>;
}
