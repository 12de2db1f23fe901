//! # strata-changelog
//!
//! Changelog document model and parser for the Strata migration engine.
//!
//! This crate provides:
//! - The [`ChangeSet`] / [`Change`] data model for declarative schema changes
//! - Content fingerprinting for drift detection
//! - Parsing of YAML and JSON changelog documents
//! - A bundled sample changelog for bootstrapping new projects
//!
//! ## Document format
//!
//! A changelog document is an ordered list of change sets:
//!
//! ```yaml
//! databaseChangeLog:
//!   - changeSet:
//!       id: 1
//!       author: john.doe
//!       comment: Create users table
//!       changes:
//!         - createTable:
//!             tableName: users
//!             columns:
//!               - name: id
//!                 type: INTEGER
//!                 constraints:
//!                   primaryKey: true
//!                   autoIncrement: true
//!       rollback:
//!         - dropTable:
//!             tableName: users
//! ```
//!
//! Each change set carries a fingerprint derived from `(id, author, changes)`
//! at parse time; the engine records it when the change set is applied and
//! compares it again before a rollback, so a definition that silently changed
//! after being applied is caught rather than blindly reversed.

pub mod changeset;
pub mod error;
pub mod parser;
pub mod sample;

// Re-exports
pub use changeset::{
    Change, ChangeSet, ColumnConstraints, ColumnDef, IndexColumn, compute_fingerprint,
};
pub use error::{ChangelogError, ChangelogResult};
pub use parser::{load_changelog, parse_json_str, parse_yaml_str};
pub use sample::sample_changelog_yaml;
