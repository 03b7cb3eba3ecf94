//! Schedule dispatch loop.
//!
//! An interval task that, on each tick:
//!
//! 1. fires one-time schedules whose start lies inside the dispatch
//!    window, transitioning them `scheduled -> running`;
//! 2. advances active recurring schedules past their planned fire.
//!
//! Every fire is recorded in the run log under a bot+minute key and the
//! log is consulted first, so a schedule never fires twice for the same
//! minute even across overlapping ticks or restarts of the loop.
//!
//! A one-time schedule whose start slipped past the window without firing
//! (for example while the process was down) is left alone rather than
//! fired late.

use std::str::FromStr;
use std::sync::Arc;

use chrono_tz::Tz;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use schedule_core::policy::{is_within_dispatch_window, minute_key};
use schedule_core::{Clock, CronExpr, ScheduleStatus};

use crate::store::{RunLog, RunRecord, RunSource, ScheduleStore};
use crate::AppState;

/// The dispatch loop.
pub struct Dispatcher {
    schedules: Arc<ScheduleStore>,
    runs: Arc<RunLog>,
    clock: Arc<dyn Clock>,
    tz: Tz,
    window_minutes: i64,
    interval: std::time::Duration,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("tz", &self.tz)
            .field("window_minutes", &self.window_minutes)
            .field("interval", &self.interval)
            .finish()
    }
}

impl Dispatcher {
    /// Build a dispatcher over the application state.
    #[must_use]
    pub fn new(state: &AppState) -> Self {
        Self {
            schedules: Arc::clone(&state.schedules),
            runs: Arc::clone(&state.runs),
            clock: Arc::clone(&state.clock),
            tz: state.tz,
            window_minutes: state.config.scheduling.dispatch_window_minutes,
            interval: std::time::Duration::from_secs(state.config.scheduling.tick_interval_secs),
        }
    }

    /// Spawn the loop; it stops when `shutdown` is cancelled.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(interval_secs = self.interval.as_secs(), "dispatcher started");
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        tracing::info!("dispatcher stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        self.tick().await;
                    }
                }
            }
        })
    }

    /// One dispatch pass.
    pub async fn tick(&self) {
        let now = self.clock.now_utc();

        for mut schedule in self.schedules.all().await {
            if schedule.status != ScheduleStatus::Scheduled || schedule.dispatched_at.is_some() {
                continue;
            }
            if !is_within_dispatch_window(schedule.start_at, now, self.window_minutes) {
                continue;
            }

            let key = minute_key(schedule.start_at, self.tz);
            if self.runs.has_fired(&schedule.bot_instance_id, &key).await {
                continue;
            }

            schedule.mark_dispatched(now);
            self.schedules.upsert(schedule.clone()).await;
            self.runs
                .record(RunRecord::new(
                    &schedule.id,
                    &schedule.bot_instance_id,
                    schedule.phase_id.clone(),
                    RunSource::OneTime,
                    &key,
                    now,
                ))
                .await;
            tracing::info!(
                schedule_id = %schedule.id,
                bot = %schedule.bot_instance_id,
                minute = %key,
                "schedule dispatched"
            );
        }

        for mut schedule in self.schedules.all_recurring().await {
            if !schedule.is_due(now) {
                continue;
            }
            // is_due guarantees a planned fire.
            let Some(planned) = schedule.next_fire_at else {
                continue;
            };

            let next = match CronExpr::from_str(&schedule.cron_expr) {
                Ok(expr) => expr.next_after(now, self.tz),
                Err(error) => {
                    // A stored expression no longer parsing means the
                    // record was corrupted; park it instead of retrying
                    // forever.
                    tracing::warn!(
                        schedule_id = %schedule.id,
                        %error,
                        "recurring schedule has an invalid expression, deactivating"
                    );
                    schedule.is_active = false;
                    self.schedules.upsert_recurring(schedule).await;
                    continue;
                }
            };

            let key = minute_key(planned, self.tz);
            let already_fired = self.runs.has_fired(&schedule.bot_instance_id, &key).await;
            schedule.advance(now, next);
            self.schedules.upsert_recurring(schedule.clone()).await;

            if already_fired {
                continue;
            }
            self.runs
                .record(RunRecord::new(
                    &schedule.id,
                    &schedule.bot_instance_id,
                    schedule.phase_id.clone(),
                    RunSource::Recurring,
                    &key,
                    now,
                ))
                .await;
            tracing::info!(
                schedule_id = %schedule.id,
                bot = %schedule.bot_instance_id,
                minute = %key,
                "recurring schedule fired"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use chrono_tz::Europe::Amsterdam;

    use schedule_core::policy::parse_schedule_time;
    use schedule_core::{FixedClock, OneTimeSchedule, RecurringSchedule};

    fn dispatcher_at(now_local: &str) -> (Dispatcher, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::at(
            parse_schedule_time(now_local, Amsterdam).unwrap(),
        ));
        let dispatcher = Dispatcher {
            schedules: Arc::new(ScheduleStore::new()),
            runs: Arc::new(RunLog::new()),
            clock: Arc::clone(&clock) as Arc<dyn Clock>,
            tz: Amsterdam,
            window_minutes: 2,
            interval: std::time::Duration::from_secs(30),
        };
        (dispatcher, clock)
    }

    #[tokio::test]
    async fn due_schedule_fires_exactly_once() {
        let (dispatcher, clock) = dispatcher_at("2024-01-15 09:01");
        let start = parse_schedule_time("2024-01-15 09:00", Amsterdam).unwrap();
        let schedule = OneTimeSchedule::new("bot_1", start);
        let id = schedule.id.clone();
        dispatcher.schedules.upsert(schedule).await;

        dispatcher.tick().await;

        let fired = dispatcher.schedules.get(&id).await.unwrap();
        assert_eq!(fired.status, ScheduleStatus::Running);
        assert!(fired.dispatched_at.is_some());
        assert_eq!(dispatcher.runs.recent(10).await.len(), 1);

        // A second tick inside the window does not fire again.
        clock.advance(Duration::seconds(30));
        dispatcher.tick().await;
        assert_eq!(dispatcher.runs.recent(10).await.len(), 1);
    }

    #[tokio::test]
    async fn future_and_stale_schedules_are_left_alone() {
        let (dispatcher, _clock) = dispatcher_at("2024-01-15 09:00");

        let future = OneTimeSchedule::new(
            "bot_1",
            parse_schedule_time("2024-01-15 12:00", Amsterdam).unwrap(),
        );
        let future_id = future.id.clone();
        // Missed by more than the window: stays scheduled, never fires late.
        let stale = OneTimeSchedule::new(
            "bot_2",
            parse_schedule_time("2024-01-15 08:00", Amsterdam).unwrap(),
        );
        let stale_id = stale.id.clone();
        dispatcher.schedules.upsert(future).await;
        dispatcher.schedules.upsert(stale).await;

        dispatcher.tick().await;

        for id in [&future_id, &stale_id] {
            let schedule = dispatcher.schedules.get(id).await.unwrap();
            assert_eq!(schedule.status, ScheduleStatus::Scheduled);
        }
        assert!(dispatcher.runs.recent(10).await.is_empty());
    }

    #[tokio::test]
    async fn recurring_schedule_advances_past_its_fire() {
        let (dispatcher, _clock) = dispatcher_at("2024-01-15 09:00");
        let planned = parse_schedule_time("2024-01-15 09:00", Amsterdam).unwrap();
        let schedule = RecurringSchedule::new("bot_1", "0 9 * * *", Some(planned));
        let id = schedule.id.clone();
        dispatcher.schedules.upsert_recurring(schedule).await;

        dispatcher.tick().await;

        let advanced = dispatcher.schedules.get_recurring(&id).await.unwrap();
        assert_eq!(advanced.last_fired_at, Some(planned));
        let next = advanced.next_fire_at.unwrap();
        assert_eq!(
            next,
            parse_schedule_time("2024-01-16 09:00", Amsterdam).unwrap()
        );
        assert_eq!(dispatcher.runs.recent(10).await.len(), 1);

        // Next tick: nothing due anymore.
        dispatcher.tick().await;
        assert_eq!(dispatcher.runs.recent(10).await.len(), 1);
    }

    #[tokio::test]
    async fn invalid_stored_expression_deactivates_the_schedule() {
        let (dispatcher, _clock) = dispatcher_at("2024-01-15 09:00");
        let planned = parse_schedule_time("2024-01-15 09:00", Amsterdam).unwrap();
        let mut schedule = RecurringSchedule::new("bot_1", "0 9 * * *", Some(planned));
        schedule.cron_expr = "garbage".to_string();
        let id = schedule.id.clone();
        dispatcher.schedules.upsert_recurring(schedule).await;

        dispatcher.tick().await;

        let parked = dispatcher.schedules.get_recurring(&id).await.unwrap();
        assert!(!parked.is_active);
        assert!(dispatcher.runs.recent(10).await.is_empty());
    }
}
