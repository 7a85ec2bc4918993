//! Timestamp generators.

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;

/// Width of the window `datetime` samples from: ten 365-day years.
pub const PAST_WINDOW_SECS: i64 = 10 * 365 * 24 * 3600;

/// Current UTC time as RFC 3339 with sub-second digits.
///
/// This is NOT deterministic, seeding has no effect on it.
pub fn generate_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// A whole-second UTC timestamp sampled uniformly from the last ten years.
pub fn generate_past<R: Rng>(rng: &mut R) -> String {
    let now = Utc::now().timestamp();
    let start = now - PAST_WINDOW_SECS;
    let ts = rng.random_range(start..now);
    DateTime::from_timestamp(ts, 0)
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}
