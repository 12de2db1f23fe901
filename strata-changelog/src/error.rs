//! Error types for changelog parsing.

use thiserror::Error;

/// Result type alias for changelog operations.
pub type ChangelogResult<T> = Result<T, ChangelogError>;

/// Errors that can occur while reading or parsing a changelog document.
#[derive(Debug, Error)]
pub enum ChangelogError {
    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML document could not be parsed.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON document could not be parsed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The file extension does not name a supported document format.
    #[error("unsupported changelog format '{0}' (expected .yaml, .yml, or .json)")]
    UnsupportedFormat(String),

    /// The document parsed but is structurally invalid.
    #[error("invalid changelog document: {0}")]
    InvalidDocument(String),
}
