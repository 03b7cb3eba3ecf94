//! Five-field cron evaluation for recurring schedules.
//!
//! Supports the standard `minute hour day month weekday` format with
//! wildcards, exact values, lists, ranges, and `*/n` steps. Expressions
//! are evaluated as wall-clock time in the reference timezone, so a
//! "daily at 09:00" schedule stays at 09:00 local across DST changes.

use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::policy::ceil_to_minute;

/// How far ahead `next_after` scans before giving up (one leap year of
/// minutes). An expression that never matches within a year yields `None`.
const MAX_SCAN_MINUTES: i64 = 366 * 24 * 60;

/// Error parsing a cron expression.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CronError {
    /// Wrong number of whitespace-separated fields.
    #[error("cron expression must have 5 fields, got {0}")]
    FieldCount(usize),
    /// A single field failed to parse or was out of range.
    #[error("invalid {field} field {value:?}: {reason}")]
    Field {
        /// Field name (minute, hour, ...).
        field: &'static str,
        /// The raw field text.
        value: String,
        /// Human-readable reason.
        reason: String,
    },
}

/// One field of a cron expression.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    /// `*` - matches everything.
    Any,
    /// A single value.
    Exact(u32),
    /// A comma list (`1,3,5`).
    List(Vec<u32>),
    /// An inclusive range (`9-17`).
    Range(u32, u32),
    /// A step over the whole range (`*/15`).
    Step(u32),
}

impl Field {
    fn matches(&self, value: u32) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(v) => *v == value,
            Self::List(values) => values.contains(&value),
            Self::Range(start, end) => (*start..=*end).contains(&value),
            Self::Step(step) => value % step == 0,
        }
    }
}

/// A parsed cron expression.
///
/// # Examples
///
/// - `0 9 * * *` - daily at 09:00
/// - `*/15 * * * *` - every 15 minutes
/// - `0 9-17 * * 1-5` - hourly 09:00-17:00, Monday through Friday
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronExpr {
    minute: Field,
    hour: Field,
    day: Field,
    month: Field,
    weekday: Field,
}

impl FromStr for CronExpr {
    type Err = CronError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(CronError::FieldCount(parts.len()));
        }

        Ok(Self {
            minute: parse_field(parts[0], "minute", 0, 59)?,
            hour: parse_field(parts[1], "hour", 0, 23)?,
            day: parse_field(parts[2], "day", 1, 31)?,
            month: parse_field(parts[3], "month", 1, 12)?,
            weekday: parse_field(parts[4], "weekday", 0, 6)?,
        })
    }
}

fn parse_field(raw: &str, field: &'static str, min: u32, max: u32) -> Result<Field, CronError> {
    let err = |reason: String| CronError::Field {
        field,
        value: raw.to_string(),
        reason,
    };
    let parse_value = |text: &str| -> Result<u32, CronError> {
        let value: u32 = text
            .parse()
            .map_err(|_| err(format!("{text:?} is not a number")))?;
        if value < min || value > max {
            return Err(err(format!("value must be {min}-{max}")));
        }
        Ok(value)
    };

    if raw == "*" {
        return Ok(Field::Any);
    }

    if let Some(step_str) = raw.strip_prefix("*/") {
        let step: u32 = step_str
            .parse()
            .map_err(|_| err(format!("{step_str:?} is not a number")))?;
        if step == 0 || step > max {
            return Err(err(format!("step must be 1-{max}")));
        }
        return Ok(Field::Step(step));
    }

    if let Some((start, end)) = raw.split_once('-') {
        let start = parse_value(start)?;
        let end = parse_value(end)?;
        if start > end {
            return Err(err("range start exceeds end".to_string()));
        }
        return Ok(Field::Range(start, end));
    }

    if raw.contains(',') {
        let values = raw
            .split(',')
            .map(parse_value)
            .collect::<Result<Vec<u32>, CronError>>()?;
        return Ok(Field::List(values));
    }

    Ok(Field::Exact(parse_value(raw)?))
}

impl CronExpr {
    /// Whether the expression matches the given instant, evaluated as
    /// wall-clock time in `tz`.
    #[must_use]
    pub fn matches(&self, instant: DateTime<Utc>, tz: Tz) -> bool {
        let local = instant.with_timezone(&tz);
        self.minute.matches(local.minute())
            && self.hour.matches(local.hour())
            && self.day.matches(local.day())
            && self.month.matches(local.month())
            && self.weekday.matches(local.weekday().num_days_from_sunday())
    }

    /// The first matching minute strictly after `after`, or `None` if no
    /// minute within the next year matches.
    #[must_use]
    pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let mut candidate = ceil_to_minute(after + Duration::seconds(1));
        for _ in 0..MAX_SCAN_MINUTES {
            if self.matches(candidate, tz) {
                return Some(candidate);
            }
            candidate += Duration::minutes(1);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Amsterdam;

    use crate::policy::{format_schedule_time, parse_schedule_time};

    fn local(s: &str) -> DateTime<Utc> {
        parse_schedule_time(s, Amsterdam).unwrap()
    }

    #[test]
    fn wildcard_matches_any_minute() {
        let expr: CronExpr = "* * * * *".parse().unwrap();
        assert!(expr.matches(local("2024-01-15 13:37"), Amsterdam));
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert_eq!(
            "* * *".parse::<CronExpr>().unwrap_err(),
            CronError::FieldCount(3)
        );
        assert!("60 * * * *".parse::<CronExpr>().is_err());
        assert!("*/0 * * * *".parse::<CronExpr>().is_err());
        assert!("9-5 * * * *".parse::<CronExpr>().is_err());
        assert!("nope * * * *".parse::<CronExpr>().is_err());
    }

    #[test]
    fn daily_expression_evaluates_in_local_time() {
        let expr: CronExpr = "0 9 * * *".parse().unwrap();

        // Before 09:00 local: fires the same day.
        let next = expr.next_after(local("2024-01-15 08:00"), Amsterdam).unwrap();
        assert_eq!(format_schedule_time(next, Amsterdam), "2024-01-15 09:00");

        // After 09:00 local: fires the next day.
        let next = expr.next_after(local("2024-01-15 10:00"), Amsterdam).unwrap();
        assert_eq!(format_schedule_time(next, Amsterdam), "2024-01-16 09:00");
    }

    #[test]
    fn next_after_is_strictly_after() {
        let expr: CronExpr = "0 9 * * *".parse().unwrap();
        let nine = local("2024-01-15 09:00");
        let next = expr.next_after(nine, Amsterdam).unwrap();
        assert_eq!(format_schedule_time(next, Amsterdam), "2024-01-16 09:00");
    }

    #[test]
    fn step_field_fires_on_multiples() {
        let expr: CronExpr = "*/15 * * * *".parse().unwrap();
        let next = expr.next_after(local("2024-01-15 09:01"), Amsterdam).unwrap();
        assert_eq!(format_schedule_time(next, Amsterdam), "2024-01-15 09:15");
    }

    #[test]
    fn weekday_field_counts_from_sunday() {
        // 2024-01-15 is a Monday (weekday 1).
        let expr: CronExpr = "0 12 * * 1".parse().unwrap();
        assert!(expr.matches(local("2024-01-15 12:00"), Amsterdam));
        assert!(!expr.matches(local("2024-01-16 12:00"), Amsterdam));
    }
}
