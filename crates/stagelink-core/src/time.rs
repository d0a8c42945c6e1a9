//! Timestamp utilities
//!
//! Wire timestamps are Unix milliseconds, matching the envelope schema.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Timestamp type (milliseconds since the Unix epoch)
pub type Timestamp = u64;

/// Get the current Unix timestamp in milliseconds
pub fn now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as Timestamp
}

/// Convert milliseconds to Duration
pub fn to_duration(millis: Timestamp) -> Duration {
    Duration::from_millis(millis)
}
