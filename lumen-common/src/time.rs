//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC calendar day as `YYYY-MM-DD`
///
/// Daily search quotas are keyed on this string.
pub fn today() -> String {
    day_of(now())
}

/// Calendar day of a timestamp as `YYYY-MM-DD`
pub fn day_of(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d").to_string()
}

/// Milliseconds since the Unix epoch, used for unique upload suffixes
pub fn now_millis() -> i64 {
    now().timestamp_millis()
}
