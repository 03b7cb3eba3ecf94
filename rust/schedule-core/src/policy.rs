//! Timing rules and schedule time math.
//!
//! Two rules govern the calendar:
//!
//! - a schedule may only be **created** when its start is at least one hour
//!   away;
//! - a schedule may only be **deleted** while its start is still at least
//!   ten minutes away.
//!
//! Both comparisons are inclusive: a start exactly on the threshold is
//! allowed. Callers pass `now` explicitly (normally from a
//! [`crate::clock::Clock`]) and are responsible for surfacing a rejection
//! message when a predicate returns false.
//!
//! The rest of this module is wall-clock math in the reference timezone:
//! resolving a local date+time to an instant, minute keys for dispatch
//! idempotency, and carrying a time-of-day onto another date for day
//! copies.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Minimum lead time for creating a schedule.
pub const CREATE_LEAD_MINUTES: i64 = 60;

/// Minimum remaining lead time for deleting a schedule.
pub const DELETE_LEAD_MINUTES: i64 = 10;

/// Default dispatch window: a due schedule fires if its start lies within
/// this many minutes before `now`.
pub const DEFAULT_DISPATCH_WINDOW_MINUTES: i64 = 2;

/// Hour of day (local) at which drag-dropped schedules start.
pub const DEFAULT_DROP_HOUR: u32 = 9;

/// Wire format for schedule times in create/update requests.
pub const SCHEDULE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Whether a schedule starting at `target_start` may be created at `now`.
///
/// True iff `target_start >= now + 1h`; the boundary itself is allowed.
#[must_use]
pub fn can_create(target_start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    target_start >= now + Duration::minutes(CREATE_LEAD_MINUTES)
}

/// Whether a schedule starting at `scheduled_start` may still be deleted
/// at `now`.
///
/// True iff `scheduled_start >= now + 10min`; the boundary itself is
/// allowed.
#[must_use]
pub fn can_delete(scheduled_start: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    scheduled_start >= now + Duration::minutes(DELETE_LEAD_MINUTES)
}

/// Whether `start` falls inside the dispatch window ending at `now`.
#[must_use]
pub fn is_within_dispatch_window(
    start: DateTime<Utc>,
    now: DateTime<Utc>,
    window_minutes: i64,
) -> bool {
    let window_start = now - Duration::minutes(window_minutes);
    window_start <= start && start <= now
}

/// Round up to the next whole minute (10:30:45 becomes 10:31:00).
#[must_use]
pub fn ceil_to_minute(instant: DateTime<Utc>) -> DateTime<Utc> {
    let truncated = instant
        .with_second(0)
        .and_then(|dt| dt.with_nanosecond(0))
        .unwrap_or(instant);
    if truncated < instant {
        truncated + Duration::minutes(1)
    } else {
        truncated
    }
}

/// Minute-granularity idempotency key (`YYYY-MM-DD-HH-MM`) in the
/// reference timezone.
#[must_use]
pub fn minute_key(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%Y-%m-%d-%H-%M").to_string()
}

/// Calendar date of an instant in the reference timezone.
///
/// This is the bucketing rule the calendar grid uses: a schedule belongs
/// to whatever local date its start falls on.
#[must_use]
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Resolve a local date and time in `tz` to an instant.
///
/// Ambiguous local times (the repeated hour of a DST fall-back) resolve to
/// the earlier instant; local times skipped by a DST spring-forward do not
/// exist and yield `None`.
#[must_use]
pub fn local_instant(date: NaiveDate, time: NaiveTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// The default drop target for a calendar day: 09:00 local, sub-minute
/// zeroed.
#[must_use]
pub fn default_drop_instant(date: NaiveDate, tz: Tz) -> Option<DateTime<Utc>> {
    NaiveTime::from_hms_opt(DEFAULT_DROP_HOUR, 0, 0).and_then(|time| local_instant(date, time, tz))
}

/// Carry a schedule's local time-of-day onto another date.
///
/// Used by day copies: the new start keeps the original's hour and minute
/// (seconds zeroed) on `target_date`. Returns `None` when the combination
/// lands in a DST gap.
#[must_use]
pub fn copy_to_date(
    original_start: DateTime<Utc>,
    target_date: NaiveDate,
    tz: Tz,
) -> Option<DateTime<Utc>> {
    let local = original_start.with_timezone(&tz);
    let time = NaiveTime::from_hms_opt(local.hour(), local.minute(), 0)?;
    local_instant(target_date, time, tz)
}

/// Error parsing a schedule time from its wire format.
#[derive(Debug, Error)]
pub enum TimeParseError {
    /// The string did not match [`SCHEDULE_TIME_FORMAT`].
    #[error("invalid schedule time {input:?}: expected YYYY-MM-DD HH:MM")]
    Format {
        /// The offending input.
        input: String,
    },
    /// The wall-clock time does not exist in the reference timezone.
    #[error("schedule time {input:?} does not exist in timezone {tz}")]
    Nonexistent {
        /// The offending input.
        input: String,
        /// The timezone it was resolved against.
        tz: Tz,
    },
}

/// Parse a `YYYY-MM-DD HH:MM` string as a local time in `tz`.
pub fn parse_schedule_time(input: &str, tz: Tz) -> Result<DateTime<Utc>, TimeParseError> {
    let naive = NaiveDateTime::parse_from_str(input, SCHEDULE_TIME_FORMAT).map_err(|_| {
        TimeParseError::Format {
            input: input.to_string(),
        }
    })?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| TimeParseError::Nonexistent {
            input: input.to_string(),
            tz,
        })
}

/// Format an instant for display and for the schedule-time wire format.
#[must_use]
pub fn format_schedule_time(instant: DateTime<Utc>, tz: Tz) -> String {
    instant
        .with_timezone(&tz)
        .format(SCHEDULE_TIME_FORMAT)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Amsterdam;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn create_boundary_is_inclusive() {
        let now = at(2024, 1, 15, 12, 0, 0);
        assert!(can_create(now + Duration::hours(1), now));
        assert!(can_create(now + Duration::hours(2), now));
        assert!(!can_create(now + Duration::minutes(59), now));
        assert!(!can_create(now, now));
    }

    #[test]
    fn delete_boundary_is_inclusive() {
        let now = at(2024, 1, 15, 12, 0, 0);
        assert!(can_delete(now + Duration::minutes(10), now));
        assert!(!can_delete(now + Duration::minutes(9) + Duration::seconds(59), now));
        assert!(!can_delete(now + Duration::minutes(5), now));
    }

    #[test]
    fn dispatch_window_is_closed_on_both_ends() {
        let now = at(2024, 1, 15, 12, 0, 0);
        assert!(is_within_dispatch_window(now, now, 2));
        assert!(is_within_dispatch_window(now - Duration::minutes(2), now, 2));
        assert!(!is_within_dispatch_window(now - Duration::minutes(3), now, 2));
        assert!(!is_within_dispatch_window(now + Duration::seconds(1), now, 2));
    }

    #[test]
    fn ceil_to_minute_rounds_up_partial_minutes() {
        let instant = at(2024, 1, 15, 10, 30, 45);
        assert_eq!(ceil_to_minute(instant), at(2024, 1, 15, 10, 31, 0));

        let exact = at(2024, 1, 15, 10, 30, 0);
        assert_eq!(ceil_to_minute(exact), exact);
    }

    #[test]
    fn minute_key_uses_the_reference_timezone() {
        // 08:00 UTC in January is 09:00 in Amsterdam (CET, +1).
        let instant = at(2024, 1, 15, 8, 0, 0);
        assert_eq!(minute_key(instant, Amsterdam), "2024-01-15-09-00");
    }

    #[test]
    fn copy_to_date_preserves_local_hour_and_minute() {
        let original = parse_schedule_time("2024-01-10 14:30", Amsterdam).unwrap();
        let target = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
        let copied = copy_to_date(original, target, Amsterdam).unwrap();
        assert_eq!(format_schedule_time(copied, Amsterdam), "2024-01-20 14:30");
    }

    #[test]
    fn copy_to_date_zeroes_seconds() {
        let original = at(2024, 1, 10, 13, 30, 42);
        let target = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
        let copied = copy_to_date(original, target, Amsterdam).unwrap();
        assert_eq!(copied.second(), 0);
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!(matches!(
            parse_schedule_time("2024-01-10T14:30:00Z", Amsterdam),
            Err(TimeParseError::Format { .. })
        ));
        assert!(matches!(
            parse_schedule_time("not a time", Amsterdam),
            Err(TimeParseError::Format { .. })
        ));
    }

    #[test]
    fn parse_resolves_dst_gap_to_none() {
        // 2024-03-31 02:30 does not exist in Amsterdam (spring-forward).
        assert!(matches!(
            parse_schedule_time("2024-03-31 02:30", Amsterdam),
            Err(TimeParseError::Nonexistent { .. })
        ));
    }

    #[test]
    fn default_drop_instant_is_nine_local() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let instant = default_drop_instant(date, Amsterdam).unwrap();
        assert_eq!(format_schedule_time(instant, Amsterdam), "2024-01-15 09:00");
        // CET is UTC+1 in January.
        assert_eq!(instant, at(2024, 1, 15, 8, 0, 0));
    }
}
