//! Changelog document parsing.
//!
//! Documents are YAML or JSON, selected by file extension. The parser hands
//! the engine fully-formed [`ChangeSet`] values; it never talks to a store.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::changeset::{Change, ChangeSet};
use crate::error::{ChangelogError, ChangelogResult};

/// On-the-wire document root.
#[derive(Debug, Deserialize)]
struct ChangelogFile {
    #[serde(rename = "databaseChangeLog")]
    entries: Vec<ChangelogEntry>,
}

#[derive(Debug, Deserialize)]
struct ChangelogEntry {
    #[serde(rename = "changeSet")]
    change_set: ChangeSetDoc,
}

#[derive(Debug, Deserialize)]
struct ChangeSetDoc {
    #[serde(deserialize_with = "deserialize_id")]
    id: String,
    author: String,
    #[serde(default)]
    comment: String,
    changes: Vec<Change>,
    #[serde(default)]
    rollback: Vec<Change>,
}

/// Documents commonly write ids as bare integers; normalize them to strings.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum DocId {
        Text(String),
        Number(i64),
    }

    Ok(match DocId::deserialize(deserializer)? {
        DocId::Text(s) => s,
        DocId::Number(n) => n.to_string(),
    })
}

/// Parse a YAML changelog document.
pub fn parse_yaml_str(input: &str) -> ChangelogResult<Vec<ChangeSet>> {
    let file: ChangelogFile = serde_yaml::from_str(input)?;
    into_change_sets(file)
}

/// Parse a JSON changelog document.
pub fn parse_json_str(input: &str) -> ChangelogResult<Vec<ChangeSet>> {
    let file: ChangelogFile = serde_json::from_str(input)?;
    into_change_sets(file)
}

/// Load a changelog from disk, choosing the format by file extension.
pub async fn load_changelog(path: impl AsRef<Path>) -> ChangelogResult<Vec<ChangeSet>> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path).await?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "yaml" | "yml" => parse_yaml_str(&contents),
        "json" => parse_json_str(&contents),
        other => Err(ChangelogError::UnsupportedFormat(other.to_string())),
    }
}

fn into_change_sets(file: ChangelogFile) -> ChangelogResult<Vec<ChangeSet>> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut change_sets = Vec::with_capacity(file.entries.len());

    for entry in file.entries {
        let doc = entry.change_set;

        if doc.id.trim().is_empty() {
            return Err(ChangelogError::InvalidDocument(
                "change set has an empty id".to_string(),
            ));
        }
        if !seen.insert(doc.id.clone()) {
            return Err(ChangelogError::InvalidDocument(format!(
                "duplicate change set id '{}'",
                doc.id
            )));
        }

        change_sets.push(ChangeSet::new(
            doc.id,
            doc.author,
            doc.comment,
            doc.changes,
            doc.rollback,
        ));
    }

    Ok(change_sets)
}
