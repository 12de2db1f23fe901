//! End-to-end engine tests over a real SQLite database.

use std::path::Path;
use std::time::Duration;

use strata_changelog::parse_yaml_str;
use strata_migrate::{EngineConfig, LockAttempt, LockManager, MigrationError};
use strata_sqlite::{SqliteLockManager, SqliteMigrationEngine, SqliteStore, open_engine_with_config};

const USERS_PHONE_CHANGELOG: &str = r#"
databaseChangeLog:
  - changeSet:
      id: 1
      author: john.doe
      comment: Create users table
      changes:
        - createTable:
            tableName: users
            columns:
              - name: id
                type: INTEGER
                constraints:
                  primaryKey: true
                  autoIncrement: true
              - name: username
                type: VARCHAR(50)
                constraints:
                  unique: true
                  nullable: false
      rollback:
        - dropTable:
            tableName: users
  - changeSet:
      id: 2
      author: jane.smith
      comment: Add phone column to users
      changes:
        - addColumn:
            tableName: users
            column:
              name: phone
              type: VARCHAR(20)
      rollback:
        - dropColumn:
            tableName: users
            columnName: phone
"#;

async fn engine_at(path: &Path) -> SqliteMigrationEngine {
    let config = EngineConfig::new()
        .holder_id("test-engine")
        .lock_timeout(Duration::ZERO)
        .lock_poll_interval(Duration::from_millis(10));
    let engine = open_engine_with_config(path, config).await.unwrap();
    engine.initialize().await.unwrap();
    engine
}

fn table_exists(path: &Path, table: &str) -> bool {
    let conn = rusqlite::Connection::open(path).unwrap();
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )
        .unwrap();
    count > 0
}

fn column_exists(path: &Path, table: &str, column: &str) -> bool {
    let conn = rusqlite::Connection::open(path).unwrap();
    let count: i64 = conn
        .query_row(
            &format!(
                "SELECT COUNT(*) FROM pragma_table_info('{}') WHERE name = ?1",
                table
            ),
            [column],
            |row| row.get(0),
        )
        .unwrap();
    count > 0
}

#[tokio::test]
async fn update_applies_change_sets_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("test.db");
    let engine = engine_at(&db).await;

    let sets = parse_yaml_str(USERS_PHONE_CHANGELOG).unwrap();
    let report = engine.update(&sets, "changelog.yaml").await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.applied, vec!["1", "2"]);

    let entries = engine.status().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, "1");
    assert_eq!(entries[0].execution_order, 1);
    assert_eq!(entries[1].id, "2");
    assert_eq!(entries[1].execution_order, 2);

    assert!(table_exists(&db, "users"));
    assert!(column_exists(&db, "users", "phone"));
}

#[tokio::test]
async fn update_twice_applies_nothing_new() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("test.db");
    let engine = engine_at(&db).await;

    let sets = parse_yaml_str(USERS_PHONE_CHANGELOG).unwrap();
    engine.update(&sets, "changelog.yaml").await.unwrap();
    let second = engine.update(&sets, "changelog.yaml").await.unwrap();

    assert!(second.applied.is_empty());
    assert_eq!(second.skipped, vec!["1", "2"]);
    assert_eq!(engine.validate().await.unwrap(), 2);
}

#[tokio::test]
async fn rollback_one_undoes_only_the_latest() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("test.db");
    let engine = engine_at(&db).await;

    let sets = parse_yaml_str(USERS_PHONE_CHANGELOG).unwrap();
    engine.update(&sets, "changelog.yaml").await.unwrap();

    let report = engine.rollback(&sets, 1).await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.rolled_back, vec!["2"]);

    let entries = engine.status().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, "1");

    assert!(table_exists(&db, "users"));
    assert!(!column_exists(&db, "users", "phone"));
}

#[tokio::test]
async fn rollback_follows_execution_order_not_document_order() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("test.db");
    let engine = engine_at(&db).await;

    let yaml = r#"
databaseChangeLog:
  - changeSet:
      id: a
      author: t
      changes:
        - createTable:
            tableName: alpha
            columns:
              - name: x
                type: INTEGER
      rollback:
        - dropTable:
            tableName: alpha
  - changeSet:
      id: b
      author: t
      changes:
        - createTable:
            tableName: beta
            columns:
              - name: x
                type: INTEGER
      rollback:
        - dropTable:
            tableName: beta
  - changeSet:
      id: c
      author: t
      changes:
        - createTable:
            tableName: gamma
            columns:
              - name: x
                type: INTEGER
      rollback:
        - dropTable:
            tableName: gamma
"#;
    let sets = parse_yaml_str(yaml).unwrap();
    engine.update(&sets, "changelog.yaml").await.unwrap();

    let report = engine.rollback(&sets, 2).await.unwrap();
    assert_eq!(report.rolled_back, vec!["c", "b"]);

    assert!(table_exists(&db, "alpha"));
    assert!(!table_exists(&db, "beta"));
    assert!(!table_exists(&db, "gamma"));
}

#[tokio::test]
async fn failed_change_set_leaves_no_partial_effects() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("test.db");
    let engine = engine_at(&db).await;

    let yaml = r#"
databaseChangeLog:
  - changeSet:
      id: broken
      author: t
      changes:
        - createTable:
            tableName: half_done
            columns:
              - name: x
                type: INTEGER
        - rawSql:
            sql: INSERT INTO does_not_exist (x) VALUES (1)
"#;
    let sets = parse_yaml_str(yaml).unwrap();
    let report = engine.update(&sets, "changelog.yaml").await.unwrap();

    let failure = report.failure.expect("run must report the failing change set");
    assert_eq!(failure.id, "broken");
    assert!(matches!(failure.error, MigrationError::Execution { .. }));

    // The first operation's table was rolled back with the transaction, and
    // nothing was recorded.
    assert!(!table_exists(&db, "half_done"));
    assert_eq!(engine.validate().await.unwrap(), 0);
}

#[tokio::test]
async fn drifted_definition_blocks_rollback() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("test.db");
    let engine = engine_at(&db).await;

    let sets = parse_yaml_str(USERS_PHONE_CHANGELOG).unwrap();
    engine.update(&sets, "changelog.yaml").await.unwrap();

    // Same ids, but change set 2's operations differ from what was applied.
    let drifted_yaml = USERS_PHONE_CHANGELOG.replace("VARCHAR(20)", "VARCHAR(32)");
    let drifted = parse_yaml_str(&drifted_yaml).unwrap();

    let report = engine.rollback(&drifted, 1).await.unwrap();
    let failure = report.failure.expect("drift must stop the run");
    assert_eq!(failure.id, "2");
    assert!(matches!(failure.error, MigrationError::DriftDetected { .. }));

    // Neither the ledger nor the schema changed.
    assert_eq!(engine.validate().await.unwrap(), 2);
    assert!(column_exists(&db, "users", "phone"));
}

#[tokio::test]
async fn concurrent_holder_blocks_update_without_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("test.db");
    let engine = engine_at(&db).await;

    // A second process holds the lock on the same database file.
    let other_store = SqliteStore::open(&db).await.unwrap();
    let other_lock = SqliteLockManager::new(&other_store);
    assert_eq!(
        other_lock
            .try_acquire("other-process", Duration::from_secs(300))
            .await
            .unwrap(),
        LockAttempt::Acquired
    );

    let sets = parse_yaml_str(USERS_PHONE_CHANGELOG).unwrap();
    let err = engine.update(&sets, "changelog.yaml").await.unwrap_err();
    match err {
        MigrationError::LockAcquisitionFailed { holder, .. } => {
            assert_eq!(holder, "other-process");
        }
        other => panic!("expected LockAcquisitionFailed, got {:?}", other),
    }

    assert!(!table_exists(&db, "users"));
    assert_eq!(engine.validate().await.unwrap(), 0);

    // Once the holder releases, the same update goes through.
    other_lock.release("other-process").await.unwrap();
    let report = engine.update(&sets, "changelog.yaml").await.unwrap();
    assert_eq!(report.applied, vec!["1", "2"]);
}

#[tokio::test]
async fn tag_marks_the_latest_entry() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("test.db");
    let engine = engine_at(&db).await;

    assert_eq!(
        engine.tag("release-1").await.unwrap_err(),
        MigrationError::NoAppliedMigrations
    );

    let sets = parse_yaml_str(USERS_PHONE_CHANGELOG).unwrap();
    engine.update(&sets, "changelog.yaml").await.unwrap();

    assert_eq!(engine.tag("release-1").await.unwrap(), "2");
    let entries = engine.status().await.unwrap();
    assert_eq!(entries[1].tag.as_deref(), Some("release-1"));
    assert_eq!(entries[0].tag, None);
}

#[tokio::test]
async fn clear_wipes_the_ledger_only() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("test.db");
    let engine = engine_at(&db).await;

    let sets = parse_yaml_str(USERS_PHONE_CHANGELOG).unwrap();
    engine.update(&sets, "changelog.yaml").await.unwrap();

    engine.clear().await.unwrap();
    assert_eq!(engine.validate().await.unwrap(), 0);

    // The schema objects themselves are untouched; only history is gone.
    assert!(table_exists(&db, "users"));
}

#[tokio::test]
async fn insert_row_binds_document_values() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("test.db");
    let engine = engine_at(&db).await;

    let yaml = r#"
databaseChangeLog:
  - changeSet:
      id: seed
      author: t
      changes:
        - createTable:
            tableName: settings
            columns:
              - name: key
                type: TEXT
              - name: value
                type: TEXT
              - name: enabled
                type: BOOLEAN
        - insertRow:
            tableName: settings
            columns:
              key: retention
              value: 30d
              enabled: true
"#;
    let sets = parse_yaml_str(yaml).unwrap();
    let report = engine.update(&sets, "changelog.yaml").await.unwrap();
    assert!(report.is_success());

    let conn = rusqlite::Connection::open(&db).unwrap();
    let (value, enabled): (String, i64) = conn
        .query_row(
            "SELECT value, enabled FROM settings WHERE key = 'retention'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(value, "30d");
    assert_eq!(enabled, 1);
}
