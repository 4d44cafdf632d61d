//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

/// Whole seconds elapsed since `since`, never negative
pub fn seconds_since(since: DateTime<Utc>) -> u64 {
    Utc::now().signed_duration_since(since).num_seconds().max(0) as u64
}
