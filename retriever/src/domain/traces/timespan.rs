//! Query window tokens.
//!
//! Callers speak ISO 8601 durations (`PT1H`, `P7D`); the analytics query
//! language wants its own relative form (`1h`, `7d`). Unknown tokens are a
//! configuration slip, not a reason to fail the query, so they map to one
//! hour.

/// Supported windows as (ISO 8601 duration, query-language offset)
const TIMESPANS: &[(&str, &str)] = &[
    ("PT15M", "15m"),
    ("PT30M", "30m"),
    ("PT1H", "1h"),
    ("PT2H", "2h"),
    ("PT6H", "6h"),
    ("PT12H", "12h"),
    ("PT24H", "24h"),
    ("P1D", "1d"),
    ("P7D", "7d"),
    ("P30D", "30d"),
];

/// ISO token used when the requested one is not recognized
pub const DEFAULT_TIMESPAN: &str = "PT1H";

/// Offset used when the requested token is not recognized
pub const DEFAULT_OFFSET: &str = "1h";

fn lookup(token: &str) -> Option<&'static (&'static str, &'static str)> {
    let token = token.trim();
    TIMESPANS
        .iter()
        .find(|(iso, _)| iso.eq_ignore_ascii_case(token))
}

/// Map an ISO 8601 duration token to the backend's relative-time syntax.
///
/// Case-insensitive; never fails.
pub fn normalize(token: &str) -> &'static str {
    match lookup(token) {
        Some((_, offset)) => *offset,
        None => {
            tracing::warn!(
                timespan = token,
                fallback = DEFAULT_OFFSET,
                "Unknown timespan, using default window"
            );
            DEFAULT_OFFSET
        }
    }
}

/// Canonical upper-case ISO token for a requested window.
///
/// Sent as the `timespan` of HTTP queries so both backends look at the same
/// window even when the caller passed an unknown token.
pub fn canonical(token: &str) -> &'static str {
    lookup(token).map(|(iso, _)| *iso).unwrap_or(DEFAULT_TIMESPAN)
}
