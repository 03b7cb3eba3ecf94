//! Month calendar grid.
//!
//! The scheduling calendar always renders six full weeks: 42 cells, the
//! first of which is the most recent Sunday on or before the 1st of the
//! month. Schedules attach to cells by exact calendar-date match in the
//! reference timezone, never by range containment.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;

use crate::domain::OneTimeSchedule;
use crate::policy::local_date;

/// Number of cells in the grid: six weeks of seven days.
pub const GRID_CELLS: usize = 42;

/// One cell of the month grid.
///
/// Derived, never persisted: recomputed from the schedule collection on
/// every render.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarDay {
    /// Calendar date of this cell (reference timezone).
    pub date: NaiveDate,
    /// Schedules starting on this date, ordered by start instant.
    pub schedules: Vec<OneTimeSchedule>,
}

/// Error building a month grid.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    /// The year/month pair does not name a calendar month.
    #[error("invalid calendar month: {year}-{month:02}")]
    InvalidMonth {
        /// Requested year.
        year: i32,
        /// Requested month (1-12).
        month: u32,
    },
}

/// The Sunday on or before the 1st of the given month.
#[must_use]
pub fn grid_anchor(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let back = i64::from(first.weekday().num_days_from_sunday());
    Some(first - Duration::days(back))
}

/// Build the 42-cell grid for a month.
///
/// Pure function of its inputs: same month and schedule collection, same
/// grid. Schedules within a cell are ordered by start instant (id as a
/// tiebreak) so the result is stable regardless of input order.
pub fn month_grid(
    year: i32,
    month: u32,
    schedules: &[OneTimeSchedule],
    tz: Tz,
) -> Result<Vec<CalendarDay>, GridError> {
    let anchor = grid_anchor(year, month).ok_or(GridError::InvalidMonth { year, month })?;

    let mut by_date: HashMap<NaiveDate, Vec<OneTimeSchedule>> = HashMap::new();
    for schedule in schedules {
        by_date
            .entry(local_date(schedule.start_at, tz))
            .or_default()
            .push(schedule.clone());
    }

    let mut cells = Vec::with_capacity(GRID_CELLS);
    for offset in 0..GRID_CELLS {
        let date = anchor + Duration::days(offset as i64);
        let mut day_schedules = by_date.remove(&date).unwrap_or_default();
        day_schedules.sort_by(|a, b| a.start_at.cmp(&b.start_at).then_with(|| a.id.cmp(&b.id)));
        cells.push(CalendarDay {
            date,
            schedules: day_schedules,
        });
    }

    Ok(cells)
}
