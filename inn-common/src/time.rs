//! Timestamp utilities

use chrono::{DateTime, SecondsFormat, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC time as stored in the database (RFC 3339, millisecond precision)
pub fn now_rfc3339() -> String {
    to_rfc3339(now())
}

/// Format a timestamp the way the database stores it
pub fn to_rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
