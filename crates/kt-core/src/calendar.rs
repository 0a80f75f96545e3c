//! # Budapest Calendar
//!
//! The business runs on Budapest local time regardless of where the server
//! sits. Rate caches roll over at Budapest midnight and "this month" in a
//! report means the Budapest month.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Europe::Budapest;

/// The Budapest calendar date at `now`.
pub fn budapest_today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&Budapest).date_naive()
}

/// The Budapest wall-clock time at `now`.
pub fn budapest_time(now: DateTime<Utc>) -> NaiveTime {
    now.with_timezone(&Budapest).time()
}

/// The (year, month) of `now` in Budapest.
pub fn budapest_year_month(now: DateTime<Utc>) -> (i32, u32) {
    let local = now.with_timezone(&Budapest);
    (local.year(), local.month())
}

/// The instant of the next Budapest midnight after `now`.
pub fn next_budapest_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let tomorrow = budapest_today(now).succ_opt().unwrap_or(NaiveDate::MAX);
    let midnight = tomorrow.and_time(NaiveTime::MIN);
    match Budapest.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Midnight never falls in a Budapest DST gap; a day is a safe bound.
        None => now + Duration::hours(24),
    }
}

/// Seconds from `now` until the next Budapest midnight, at least 1.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use kt_core::calendar::seconds_until_budapest_midnight;
///
/// // 22:59:00 UTC in January is 23:59:00 in Budapest (CET, UTC+1)
/// let now = Utc.with_ymd_and_hms(2026, 1, 15, 22, 59, 0).unwrap();
/// assert_eq!(seconds_until_budapest_midnight(now), 60);
/// ```
pub fn seconds_until_budapest_midnight(now: DateTime<Utc>) -> u64 {
    let remaining = (next_budapest_midnight(now) - now).num_seconds();
    remaining.max(1) as u64
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budapest_day_differs_from_utc_day_late_evening() {
        // 23:30 UTC on 14 Jan is already 00:30 on 15 Jan in Budapest
        let now = Utc.with_ymd_and_hms(2026, 1, 14, 23, 30, 0).unwrap();
        assert_eq!(
            budapest_today(now),
            NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
        );
    }

    #[test]
    fn test_short_ttl_just_before_midnight() {
        // 21:59:00 UTC in July is 23:59:00 CEST
        let now = Utc.with_ymd_and_hms(2026, 7, 10, 21, 59, 0).unwrap();
        assert_eq!(seconds_until_budapest_midnight(now), 60);
    }

    #[test]
    fn test_long_ttl_just_after_midnight() {
        // 22:01:00 UTC in July is 00:01:00 CEST the next day
        let now = Utc.with_ymd_and_hms(2026, 7, 10, 22, 1, 0).unwrap();
        assert_eq!(seconds_until_budapest_midnight(now), 24 * 3600 - 60);
    }

    #[test]
    fn test_dst_change_day_is_23_hours() {
        // 2026-03-29 clocks jump from 02:00 to 03:00 in Budapest.
        // Local midnight on the 29th is 23:00 UTC on the 28th.
        let now = Utc.with_ymd_and_hms(2026, 3, 28, 23, 0, 0).unwrap();
        assert_eq!(seconds_until_budapest_midnight(now), 23 * 3600);
    }

    #[test]
    fn test_year_month() {
        let now = Utc.with_ymd_and_hms(2025, 12, 31, 23, 30, 0).unwrap();
        assert_eq!(budapest_year_month(now), (2026, 1));
    }
}
