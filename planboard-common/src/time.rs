//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current Unix time in milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Next `lastUpdate` stamp after `previous`
///
/// Stamps are wall-clock milliseconds but never repeat or go backwards:
/// a clock that stalls or steps back still yields `previous + 1`.
pub fn next_stamp(previous: i64) -> i64 {
    now_millis().max(previous.saturating_add(1))
}
