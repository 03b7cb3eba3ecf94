//! Flat list projections over the schedule collections.
//!
//! The list view is the alternative to the calendar grid: one
//! display-ready row per schedule with the bot and phase names resolved,
//! filterable by status and free-text search, and paginated so large
//! collections never have to be held by the view at once.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::domain::{BotInstance, OneTimeSchedule, Phase, RecurringSchedule, ScheduleStatus};
use crate::policy::format_schedule_time;

/// Label shown for schedules that target the whole bot run.
pub const FULL_RUN_LABEL: &str = "full run";

/// Placeholder for a bot the registry no longer knows.
const UNKNOWN_BOT_LABEL: &str = "unknown";

/// A display-ready row for a one-time schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleRow {
    /// Schedule identifier.
    pub schedule_id: String,
    /// Resolved bot code.
    pub bot_code: String,
    /// Resolved phase name; absent for full runs.
    pub phase_name: Option<String>,
    /// Start instant, kept for sorting.
    pub start_at: DateTime<Utc>,
    /// Start formatted in the reference timezone.
    pub start_display: String,
    /// Current status.
    pub status: ScheduleStatus,
    /// Badge color class for the status.
    pub badge: &'static str,
}

impl ScheduleRow {
    /// What this row runs: the phase name, or the full-run label.
    #[must_use]
    pub fn run_label(&self) -> &str {
        self.phase_name.as_deref().unwrap_or(FULL_RUN_LABEL)
    }
}

/// Client-side filter over schedule rows.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    /// Keep only rows with this status.
    pub status: Option<ScheduleStatus>,
    /// Keep only rows for this bot instance.
    pub bot_instance_id: Option<String>,
    /// Case-insensitive search over bot code and phase name.
    pub search: Option<String>,
}

impl ListFilter {
    fn matches(&self, schedule: &OneTimeSchedule, bot_code: &str, phase_name: Option<&str>) -> bool {
        if self.status.is_some_and(|status| status != schedule.status) {
            return false;
        }
        if self
            .bot_instance_id
            .as_ref()
            .is_some_and(|id| *id != schedule.bot_instance_id)
        {
            return false;
        }
        if let Some(ref needle) = self.search {
            let needle = needle.to_lowercase();
            let in_bot = bot_code.to_lowercase().contains(&needle);
            let in_phase =
                phase_name.is_some_and(|name| name.to_lowercase().contains(&needle));
            if !in_bot && !in_phase {
                return false;
            }
        }
        true
    }
}

/// One page of schedule rows plus the counts the "showing N of M" header
/// needs.
#[derive(Debug, Clone, Serialize)]
pub struct ListPage {
    /// Rows on this page, ordered by start instant.
    pub rows: Vec<ScheduleRow>,
    /// 1-based page number requested.
    pub page: usize,
    /// Page size requested.
    pub per_page: usize,
    /// Total rows matching the filter, across all pages.
    pub total: usize,
}

/// Project one-time schedules into a filtered, paginated list.
///
/// `page` is 1-based; a page past the end yields an empty row set with the
/// total intact.
#[must_use]
pub fn schedule_page(
    schedules: &[OneTimeSchedule],
    bots: &HashMap<String, BotInstance>,
    phases: &HashMap<String, Phase>,
    filter: &ListFilter,
    page: usize,
    per_page: usize,
    tz: Tz,
) -> ListPage {
    let page = page.max(1);
    let per_page = per_page.max(1);

    let mut rows: Vec<ScheduleRow> = schedules
        .iter()
        .filter_map(|schedule| {
            let bot_code = bots
                .get(&schedule.bot_instance_id)
                .map_or(UNKNOWN_BOT_LABEL, |bot| bot.bot_code.as_str());
            let phase_name = schedule
                .phase_id
                .as_ref()
                .and_then(|id| phases.get(id))
                .map(|phase| phase.name.as_str());

            filter
                .matches(schedule, bot_code, phase_name)
                .then(|| ScheduleRow {
                    schedule_id: schedule.id.clone(),
                    bot_code: bot_code.to_string(),
                    phase_name: phase_name.map(ToString::to_string),
                    start_at: schedule.start_at,
                    start_display: format_schedule_time(schedule.start_at, tz),
                    status: schedule.status,
                    badge: schedule.status.badge(),
                })
        })
        .collect();
    rows.sort_by(|a, b| {
        a.start_at
            .cmp(&b.start_at)
            .then_with(|| a.schedule_id.cmp(&b.schedule_id))
    });

    let total = rows.len();
    let rows = rows
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    ListPage {
        rows,
        page,
        per_page,
        total,
    }
}

/// A display-ready row for a recurring schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecurringRow {
    /// Schedule identifier.
    pub schedule_id: String,
    /// Resolved bot code.
    pub bot_code: String,
    /// Resolved phase name; absent for full runs.
    pub phase_name: Option<String>,
    /// The cron expression as entered.
    pub cron_expr: String,
    /// Next fire formatted in the reference timezone, if planned.
    pub next_fire_display: Option<String>,
    /// Whether the dispatcher will fire this schedule.
    pub is_active: bool,
}

/// Project recurring schedules into display rows ordered by next fire.
#[must_use]
pub fn recurring_rows(
    schedules: &[RecurringSchedule],
    bots: &HashMap<String, BotInstance>,
    phases: &HashMap<String, Phase>,
    tz: Tz,
) -> Vec<RecurringRow> {
    let mut rows: Vec<(Option<DateTime<Utc>>, RecurringRow)> = schedules
        .iter()
        .map(|schedule| {
            let bot_code = bots
                .get(&schedule.bot_instance_id)
                .map_or(UNKNOWN_BOT_LABEL, |bot| bot.bot_code.as_str());
            let phase_name = schedule
                .phase_id
                .as_ref()
                .and_then(|id| phases.get(id))
                .map(|phase| phase.name.clone());
            let row = RecurringRow {
                schedule_id: schedule.id.clone(),
                bot_code: bot_code.to_string(),
                phase_name,
                cron_expr: schedule.cron_expr.clone(),
                next_fire_display: schedule
                    .next_fire_at
                    .map(|next| format_schedule_time(next, tz)),
                is_active: schedule.is_active,
            };
            (schedule.next_fire_at, row)
        })
        .collect();
    // Planned fires first, soonest first; dormant schedules trail.
    rows.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.1.schedule_id.cmp(&b.1.schedule_id),
    });
    rows.into_iter().map(|(_, row)| row).collect()
}
