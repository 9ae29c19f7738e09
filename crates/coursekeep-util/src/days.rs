//! Day arithmetic for access windows

use chrono::{DateTime, Utc};

/// Seconds in one access day
pub const SECONDS_PER_DAY: i64 = 86_400;

const MILLIS_PER_DAY: i64 = SECONDS_PER_DAY * 1000;

/// Whole days left until `deadline`, rounded up.
///
/// Anything less than a full day still counts as one day. A deadline at or
/// before `now` yields zero.
pub fn days_until_ceil(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    let millis = deadline.signed_duration_since(now).num_milliseconds();
    if millis <= 0 {
        return 0;
    }
    let days = (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY;
    u32::try_from(days).unwrap_or(u32::MAX)
}

/// A span of whole access days as a chrono duration
pub fn days(n: u32) -> chrono::Duration {
    chrono::Duration::days(i64::from(n))
}
