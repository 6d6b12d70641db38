//! SQLite-backed repository implementations.
//!
//! All repositories share a `DatabasePool` (split reader/writer, WAL
//! mode) and follow the same shape: raw queries, private Row structs for
//! SQLite-to-domain mapping, reads on the reader pool, writes on the
//! single-connection writer pool.

pub mod conversation;
pub mod message;
pub mod pool;
pub mod profile;

pub use conversation::SqliteConversationRepository;
pub use message::SqliteMessageRepository;
pub use pool::DatabasePool;
pub use profile::SqliteProfileRepository;

use chrono::{DateTime, SecondsFormat, Utc};
use duolog_types::error::RepositoryError;
use uuid::Uuid;

pub(crate) fn parse_uuid(s: &str, field: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(|e| RepositoryError::Query(format!("invalid {field}: {e}")))
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width RFC 3339 (microseconds, `Z` suffix) so that comparing the
/// TEXT column compares instants.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// `?, ?, ...` for an `IN` list of `n` bind parameters.
pub(crate) fn placeholders(n: usize) -> String {
    let mut s = String::with_capacity(n * 3);
    for i in 0..n {
        if i > 0 {
            s.push_str(", ");
        }
        s.push('?');
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_datetimes_have_fixed_width() {
        let whole_second = DateTime::parse_from_rfc3339("2026-08-27T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let fractional = DateTime::parse_from_rfc3339("2026-08-27T10:00:00.5Z")
            .unwrap()
            .with_timezone(&Utc);

        let a = format_datetime(&whole_second);
        let b = format_datetime(&fractional);
        assert_eq!(a.len(), b.len());
        // Text order equals time order.
        assert!(a < b);
    }

    #[test]
    fn datetime_round_trips() {
        let now = Utc::now();
        let parsed = parse_datetime(&format_datetime(&now)).unwrap();
        // Storage keeps microsecond precision.
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn placeholder_lists() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
        assert_eq!(placeholders(0), "");
    }
}
