use crate::core::time;
use chrono::{DateTime, Duration, Utc};

/// Hours without a human touch before decay starts.
pub const GRACE_HOURS: i64 = 24;

/// Audit-decay penalty for the time since the last human touch.
///
/// One point on crossing the 24h grace window, plus one per further full
/// 24h. A missing, unparseable, or future timestamp never penalizes.
pub fn decay(last_touch: Option<&str>, now: DateTime<Utc>) -> u32 {
    let Some(last) = last_touch.and_then(time::parse_timestamp) else {
        return 0;
    };
    let elapsed = now.signed_duration_since(last);
    let grace = Duration::hours(GRACE_HOURS);
    if elapsed <= grace {
        return 0;
    }
    let overdue_periods = (elapsed - grace).num_seconds() / grace.num_seconds();
    u32::try_from(overdue_periods + 1).unwrap_or(u32::MAX)
}
