//! Wall-clock helpers. All timestamps in this crate are whole seconds since
//! the Unix epoch, UTC.

use chrono::{TimeZone, Utc};

/// The current time in seconds since the Unix epoch.
pub fn now() -> i64 {
    Utc::now().timestamp()
}

/// Whether `timestamp` names an instant chrono can represent.
///
/// Timestamps outside this range, roughly 262,000 years either side of the
/// epoch, are rejected on input.
pub fn is_representable(timestamp: i64) -> bool {
    Utc.timestamp_opt(timestamp, 0).single().is_some()
}

/// The start of the `width`-second window that `timestamp` falls into
///
/// Windows are aligned to the epoch. Timestamps before the epoch round down,
/// toward negative infinity. A `width` below one is treated as one. Returns
/// `None` if the window would start before `i64::MIN`.
///
/// # Examples
///
/// ```
/// use metricline::time::window_start;
///
/// assert_eq!(Some(10), window_start(17, 10));
/// assert_eq!(Some(20), window_start(20, 10));
/// assert_eq!(Some(-10), window_start(-3, 10));
/// assert_eq!(None, window_start(i64::min_value(), 10));
/// ```
pub fn window_start(timestamp: i64, width: i64) -> Option<i64> {
    let width = if width < 1 { 1 } else { width };
    timestamp.checked_sub(timestamp.rem_euclid(width))
}
