//! Time utility functions

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

/// Parse ISO 8601 / RFC 3339 timestamp string to DateTime<Utc>
pub fn parse_iso_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Order two ISO timestamps chronologically.
///
/// Backends disagree on offsets and fractional digits (`...Z` vs `...+00:00`,
/// 3 vs 7 digits), so plain string comparison is only used when either side
/// fails to parse.
pub fn compare_iso_timestamps(a: &str, b: &str) -> Ordering {
    match (parse_iso_timestamp(a), parse_iso_timestamp(b)) {
        (Some(left), Some(right)) => left.cmp(&right),
        _ => a.cmp(b),
    }
}
