//! Time utilities.

use chrono::{DateTime, Utc};

/// A timestamp with timezone (always UTC for RateBridge).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}
