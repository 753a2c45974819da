//! Timestamp formatting for persisted state.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a timestamp as RFC3339 with nanosecond precision, trailing zeros
/// of the fraction trimmed (`2021-06-01T12:00:00.5Z`, `2021-06-01T12:00:00Z`).
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    let full = timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true);

    match full.strip_suffix('Z').and_then(|rest| rest.split_once('.')) {
        Some((seconds, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{seconds}Z")
            } else {
                format!("{seconds}.{fraction}Z")
            }
        }
        None => full,
    }
}

/// Format an optional server timestamp; absent timestamps become empty strings.
#[must_use]
pub fn format_optional_timestamp(timestamp: Option<&DateTime<Utc>>) -> String {
    timestamp.map(format_timestamp).unwrap_or_default()
}
