use crate::Amount;
use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_MAX_OFFLINE_HOURS: u64 = 4;

/// Seconds of offline time that count, clamped to `[0, max_hours]`.
pub fn credited_seconds(elapsed: Duration, max_hours: u64) -> u64 {
    let secs = elapsed.num_seconds().max(0) as u64;
    secs.min(max_hours.saturating_mul(3_600))
}

/// Passive income for an absence of `elapsed`.
pub fn offline_earnings(elapsed: Duration, rate_per_sec: f64, max_hours: u64) -> Amount {
    if !(rate_per_sec.is_finite() && rate_per_sec > 0.0) {
        return 0;
    }
    let v = (credited_seconds(elapsed, max_hours) as f64 * rate_per_sec).round();
    if v >= Amount::MAX as f64 {
        Amount::MAX
    } else {
        v as Amount
    }
}

pub fn elapsed_since(last_active: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
    match last_active {
        Some(t) => now - t,
        None => Duration::zero(),
    }
}
