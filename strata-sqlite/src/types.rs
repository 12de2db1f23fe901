//! Value and timestamp conversions between the engine and rusqlite.

use chrono::{DateTime, SecondsFormat, Utc};
use strata_migrate::SqlValue;

/// Lower an engine parameter to a rusqlite value.
pub(crate) fn to_sqlite_value(value: SqlValue) -> rusqlite::types::Value {
    match value {
        SqlValue::Null => rusqlite::types::Value::Null,
        SqlValue::Integer(i) => rusqlite::types::Value::Integer(i),
        SqlValue::Real(f) => rusqlite::types::Value::Real(f),
        SqlValue::Text(s) => rusqlite::types::Value::Text(s),
    }
}

/// Format a timestamp for storage.
///
/// Fixed-width UTC RFC 3339 (`...Z`, microsecond precision) so stored values
/// compare chronologically under SQLite's lexicographic TEXT ordering; the
/// lock staleness check relies on this.
pub(crate) fn fmt_timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_roundtrip() {
        let now = Utc::now();
        let parsed = parse_timestamp(&fmt_timestamp(now)).unwrap();
        // Microsecond precision is preserved; nanoseconds are truncated.
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn test_timestamps_order_lexicographically() {
        let earlier = fmt_timestamp("2026-01-01T00:00:00Z".parse().unwrap());
        let later = fmt_timestamp("2026-01-01T00:00:00.000001Z".parse().unwrap());
        assert!(earlier < later);
        assert_eq!(earlier.len(), later.len());
    }

    #[test]
    fn test_to_sqlite_value() {
        assert_eq!(
            to_sqlite_value(SqlValue::Integer(7)),
            rusqlite::types::Value::Integer(7)
        );
        assert_eq!(
            to_sqlite_value(SqlValue::Text("x".to_string())),
            rusqlite::types::Value::Text("x".to_string())
        );
        assert_eq!(to_sqlite_value(SqlValue::Null), rusqlite::types::Value::Null);
    }
}
