//! Staleness evaluation for stored rate records.

use chrono::Duration;
use ratebridge_common::{now, RateRecord};

/// Decide whether a stored record has outlived the expiration window.
///
/// The reference time is the record's last write: `updated_at` when present,
/// else `created_at`. A record sitting exactly on the boundary counts as
/// expired. A zero window makes every record immediately stale.
pub fn is_expired(record: &RateRecord, expiration_minutes: u32) -> bool {
    let reference = record.updated_at.unwrap_or(record.created_at);
    now() >= reference + Duration::minutes(i64::from(expiration_minutes))
}
