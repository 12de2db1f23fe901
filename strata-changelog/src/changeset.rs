//! Change set and change operation types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A uniquely identified, author-attributed unit of schema change.
///
/// A change set is the unit of application: either every operation in it is
/// applied and the set is recorded in the ledger, or none are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Unique identifier within a document.
    pub id: String,
    /// Author attribution (informational).
    pub author: String,
    /// Human-readable description (informational).
    pub description: String,
    /// Operations applied in document order when this change set runs.
    pub operations: Vec<Change>,
    /// Operations applied in document order when this change set is reversed.
    pub rollback_operations: Vec<Change>,
    /// SHA-256 digest over `(id, author, operations)`, computed at parse time.
    pub fingerprint: String,
}

impl ChangeSet {
    /// Create a new change set, computing its fingerprint.
    pub fn new(
        id: impl Into<String>,
        author: impl Into<String>,
        description: impl Into<String>,
        operations: Vec<Change>,
        rollback_operations: Vec<Change>,
    ) -> Self {
        let id = id.into();
        let author = author.into();
        let fingerprint = compute_fingerprint(&id, &author, &operations);

        Self {
            id,
            author,
            description: description.into(),
            operations,
            rollback_operations,
            fingerprint,
        }
    }

    /// Check if this change set declares rollback operations.
    pub fn has_rollback(&self) -> bool {
        !self.rollback_operations.is_empty()
    }
}

/// Compute the content fingerprint for a change set.
///
/// The digest covers the id, the author, and the apply operations in their
/// stable JSON serialization. Rollback operations and the description do not
/// participate: editing them after the fact does not invalidate what was
/// actually applied.
pub fn compute_fingerprint(id: &str, author: &str, operations: &[Change]) -> String {
    let ops = serde_json::to_string(operations)
        .expect("change operations serialize to JSON infallibly");

    let mut hasher = Sha256::new();
    hasher.update(id.as_bytes());
    hasher.update([0u8]);
    hasher.update(author.as_bytes());
    hasher.update([0u8]);
    hasher.update(ops.as_bytes());
    hex::encode(hasher.finalize())
}

/// A single declarative change operation.
///
/// The set of kinds is closed: dispatch over a `Change` is an exhaustive
/// match, so adding a kind without handling it everywhere is a compile error.
/// Unknown tags in a document fail at parse time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Change {
    /// Create a table with the given column definitions.
    #[serde(rename_all = "camelCase")]
    CreateTable {
        table_name: String,
        columns: Vec<ColumnDef>,
    },

    /// Add a single column to an existing table.
    #[serde(rename_all = "camelCase")]
    AddColumn {
        table_name: String,
        column: ColumnDef,
    },

    /// Drop a column from a table.
    #[serde(rename_all = "camelCase")]
    DropColumn {
        table_name: String,
        column_name: String,
    },

    /// Rename a column.
    #[serde(rename_all = "camelCase")]
    RenameColumn {
        table_name: String,
        old_column_name: String,
        new_column_name: String,
    },

    /// Create an index over one or more columns.
    #[serde(rename_all = "camelCase")]
    CreateIndex {
        index_name: String,
        table_name: String,
        columns: Vec<IndexColumn>,
    },

    /// Drop a table.
    #[serde(rename_all = "camelCase")]
    DropTable { table_name: String },

    /// Execute a raw SQL statement verbatim.
    #[serde(rename_all = "camelCase")]
    RawSql { sql: String },

    /// Insert a single row; column values bind as SQL parameters.
    #[serde(rename_all = "camelCase")]
    InsertRow {
        table_name: String,
        columns: IndexMap<String, serde_json::Value>,
    },
}

impl Change {
    /// The document tag for this change kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Change::CreateTable { .. } => "createTable",
            Change::AddColumn { .. } => "addColumn",
            Change::DropColumn { .. } => "dropColumn",
            Change::RenameColumn { .. } => "renameColumn",
            Change::CreateIndex { .. } => "createIndex",
            Change::DropTable { .. } => "dropTable",
            Change::RawSql { .. } => "rawSql",
            Change::InsertRow { .. } => "insertRow",
        }
    }
}

/// A column definition inside a `createTable` or `addColumn` change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// SQL type as written in the document (e.g. `VARCHAR(50)`).
    #[serde(rename = "type")]
    pub column_type: String,
    /// Column constraints.
    #[serde(default, skip_serializing_if = "ColumnConstraints::is_empty")]
    pub constraints: ColumnConstraints,
    /// Default value rendered into the column definition as written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
}

impl ColumnDef {
    /// Create a plain column with no constraints or default.
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
            constraints: ColumnConstraints::default(),
            default_value: None,
        }
    }
}

/// Constraints attached to a column definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnConstraints {
    pub primary_key: bool,
    pub auto_increment: bool,
    /// `Some(false)` renders NOT NULL; absent or `Some(true)` leaves the
    /// column nullable.
    pub nullable: Option<bool>,
    pub unique: bool,
}

impl ColumnConstraints {
    /// True when no constraint is set (used to elide the field on the wire).
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A column reference inside a `createIndex` change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    pub name: String,
}

impl IndexColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn create_users() -> Change {
        Change::CreateTable {
            table_name: "users".to_string(),
            columns: vec![ColumnDef::new("id", "INTEGER")],
        }
    }

    #[test]
    fn test_fingerprint_stable() {
        let a = compute_fingerprint("1", "john.doe", &[create_users()]);
        let b = compute_fingerprint("1", "john.doe", &[create_users()]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_id_author_operations() {
        let base = compute_fingerprint("1", "john.doe", &[create_users()]);

        assert_ne!(base, compute_fingerprint("2", "john.doe", &[create_users()]));
        assert_ne!(base, compute_fingerprint("1", "jane.smith", &[create_users()]));
        assert_ne!(
            base,
            compute_fingerprint(
                "1",
                "john.doe",
                &[Change::DropTable {
                    table_name: "users".to_string(),
                }],
            )
        );
    }

    #[test]
    fn test_fingerprint_ignores_rollback_and_description() {
        let with_rollback = ChangeSet::new(
            "1",
            "john.doe",
            "create users",
            vec![create_users()],
            vec![Change::DropTable {
                table_name: "users".to_string(),
            }],
        );
        let without_rollback =
            ChangeSet::new("1", "john.doe", "something else", vec![create_users()], vec![]);

        assert_eq!(with_rollback.fingerprint, without_rollback.fingerprint);
    }

    #[test]
    fn test_change_serializes_with_camel_case_tag() {
        let json = serde_json::to_string(&create_users()).unwrap();
        assert!(json.contains("createTable"));
        assert!(json.contains("tableName"));
    }

    #[test]
    fn test_change_kind() {
        assert_eq!(create_users().kind(), "createTable");
        assert_eq!(
            Change::RawSql {
                sql: "SELECT 1".to_string()
            }
            .kind(),
            "rawSql"
        );
    }

    #[test]
    fn test_column_constraints_roundtrip() {
        let col: ColumnDef = serde_json::from_str(
            r#"{
                "name": "username",
                "type": "VARCHAR(50)",
                "constraints": { "nullable": false, "unique": true }
            }"#,
        )
        .unwrap();

        assert_eq!(col.constraints.nullable, Some(false));
        assert!(col.constraints.unique);
        assert!(!col.constraints.primary_key);
    }

    #[test]
    fn test_unknown_change_kind_is_rejected() {
        let result: Result<Change, _> =
            serde_json::from_str(r#"{ "truncateTable": { "tableName": "users" } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_has_rollback() {
        let cs = ChangeSet::new("1", "a", "", vec![create_users()], vec![]);
        assert!(!cs.has_rollback());
    }
}
