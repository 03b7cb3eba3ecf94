//! Schedule records.
//!
//! Two schedule shapes coexist and are deliberately kept as separate types:
//! the calendar operates on [`OneTimeSchedule`] (a single future instant),
//! while the recurring list page and the dispatcher operate on
//! [`RecurringSchedule`] (a cron expression). Merging them into one struct
//! with mutually-exclusive optional fields is exactly the confusion this
//! split avoids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a scheduled run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Scheduled,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ScheduleStatus {
    /// Badge color class used by the console views.
    #[must_use]
    pub fn badge(self) -> &'static str {
        match self {
            Self::Scheduled => "blue",
            Self::Running | Self::Completed => "green",
            Self::Failed => "red",
            Self::Cancelled => "gray",
        }
    }

    /// Whether the schedule has finished one way or another.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// A bot (or single phase) run planned for one future instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneTimeSchedule {
    /// Unique schedule identifier.
    pub id: String,
    /// Target bot instance.
    pub bot_instance_id: String,
    /// Phase to run; absent means a full bot run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<String>,
    /// When the run should start.
    pub start_at: DateTime<Utc>,
    /// Optional end of the run window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_at: Option<DateTime<Utc>>,
    /// Current status.
    pub status: ScheduleStatus,
    /// Opaque payload handed to the runner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Set once the dispatcher has fired this schedule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatched_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl OneTimeSchedule {
    /// Create a new schedule in the `scheduled` state with a fresh id.
    #[must_use]
    pub fn new(bot_instance_id: impl Into<String>, start_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            bot_instance_id: bot_instance_id.into(),
            phase_id: None,
            start_at,
            end_at: None,
            status: ScheduleStatus::Scheduled,
            payload: None,
            dispatched_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Target a single phase instead of the full run.
    #[must_use]
    pub fn with_phase(mut self, phase_id: impl Into<String>) -> Self {
        self.phase_id = Some(phase_id.into());
        self
    }

    /// Attach a runner payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Set the end of the run window.
    #[must_use]
    pub fn with_end(mut self, end_at: DateTime<Utc>) -> Self {
        self.end_at = Some(end_at);
        self
    }

    /// Whether this schedules a full bot run (no phase selected).
    #[must_use]
    pub fn is_full_run(&self) -> bool {
        self.phase_id.is_none()
    }

    /// Move the start, clearing any previous dispatch so the schedule can
    /// fire again at its new time.
    pub fn reschedule(&mut self, start_at: DateTime<Utc>, now: DateTime<Utc>) {
        self.start_at = start_at;
        if start_at > now {
            self.dispatched_at = None;
        }
        self.updated_at = now;
    }

    /// Record that the dispatcher has fired this schedule.
    pub fn mark_dispatched(&mut self, now: DateTime<Utc>) {
        self.status = ScheduleStatus::Running;
        self.dispatched_at = Some(now);
        self.updated_at = now;
    }

    /// Apply a terminal status reported by the runner.
    pub fn finish(&mut self, status: ScheduleStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}

/// A cron-driven schedule that fires repeatedly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringSchedule {
    /// Unique schedule identifier.
    pub id: String,
    /// Target bot instance.
    pub bot_instance_id: String,
    /// Phase to run; absent means a full bot run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<String>,
    /// Five-field cron expression, evaluated in the app timezone.
    pub cron_expr: String,
    /// Whether the dispatcher should fire this schedule.
    pub is_active: bool,
    /// Opaque payload handed to the runner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Next planned fire instant, if the expression yields one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_fire_at: Option<DateTime<Utc>>,
    /// Last fire instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fired_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl RecurringSchedule {
    /// Create a new active recurring schedule with a fresh id.
    ///
    /// The caller validates the expression and computes the first
    /// `next_fire_at`; this constructor stores them as given.
    #[must_use]
    pub fn new(
        bot_instance_id: impl Into<String>,
        cron_expr: impl Into<String>,
        next_fire_at: Option<DateTime<Utc>>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            bot_instance_id: bot_instance_id.into(),
            phase_id: None,
            cron_expr: cron_expr.into(),
            is_active: true,
            payload: None,
            next_fire_at,
            last_fired_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Target a single phase instead of the full run.
    #[must_use]
    pub fn with_phase(mut self, phase_id: impl Into<String>) -> Self {
        self.phase_id = Some(phase_id.into());
        self
    }

    /// Whether the schedule is due at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.next_fire_at.is_some_and(|next| next <= now)
    }

    /// Record a fire and plan the next one.
    pub fn advance(&mut self, fired_at: DateTime<Utc>, next_fire_at: Option<DateTime<Utc>>) {
        self.last_fired_at = Some(fired_at);
        self.next_fire_at = next_fire_at;
        self.updated_at = fired_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn new_schedule_is_a_full_run_until_a_phase_is_set() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let schedule = OneTimeSchedule::new("bot_1", start);
        assert!(schedule.is_full_run());
        assert_eq!(schedule.status, ScheduleStatus::Scheduled);

        let schedule = schedule.with_phase("phase_1");
        assert!(!schedule.is_full_run());
    }

    #[test]
    fn rescheduling_to_the_future_clears_dispatch() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let mut schedule = OneTimeSchedule::new("bot_1", start);
        schedule.mark_dispatched(start);
        assert_eq!(schedule.status, ScheduleStatus::Running);
        assert!(schedule.dispatched_at.is_some());

        let later = start + Duration::days(1);
        schedule.reschedule(later, start + Duration::minutes(5));
        assert!(schedule.dispatched_at.is_none());
        assert_eq!(schedule.start_at, later);
    }

    #[test]
    fn recurring_is_due_only_when_active_and_past_next_fire() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let mut schedule =
            RecurringSchedule::new("bot_1", "0 9 * * *", Some(now - Duration::minutes(1)));
        assert!(schedule.is_due(now));

        schedule.is_active = false;
        assert!(!schedule.is_due(now));

        schedule.is_active = true;
        schedule.next_fire_at = Some(now + Duration::minutes(1));
        assert!(!schedule.is_due(now));
    }
}
