//! Schedule store.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use tokio::sync::RwLock;

use schedule_core::policy::{local_date, minute_key};
use schedule_core::{OneTimeSchedule, RecurringSchedule};

/// Filter for listing one-time schedules.
#[derive(Debug, Clone, Default)]
pub struct ScheduleListQuery {
    /// Restrict to one bot instance.
    pub bot_instance_id: Option<String>,
    /// Inclusive start date (reference timezone).
    pub from_date: Option<NaiveDate>,
    /// Inclusive end date (reference timezone).
    pub to_date: Option<NaiveDate>,
}

/// One-time and recurring schedules.
#[derive(Debug, Clone, Default)]
pub struct ScheduleStore {
    one_time: Arc<RwLock<HashMap<String, OneTimeSchedule>>>,
    recurring: Arc<RwLock<HashMap<String, RecurringSchedule>>>,
}

impl ScheduleStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a one-time schedule.
    pub async fn upsert(&self, schedule: OneTimeSchedule) {
        self.one_time
            .write()
            .await
            .insert(schedule.id.clone(), schedule);
    }

    /// A one-time schedule by id.
    pub async fn get(&self, id: &str) -> Option<OneTimeSchedule> {
        self.one_time.read().await.get(id).cloned()
    }

    /// Remove a one-time schedule, returning it if present.
    pub async fn remove(&self, id: &str) -> Option<OneTimeSchedule> {
        self.one_time.write().await.remove(id)
    }

    /// All one-time schedules, unordered.
    pub async fn all(&self) -> Vec<OneTimeSchedule> {
        self.one_time.read().await.values().cloned().collect()
    }

    /// One-time schedules matching a filter, ordered by start.
    pub async fn list(&self, query: &ScheduleListQuery, tz: Tz) -> Vec<OneTimeSchedule> {
        let mut schedules: Vec<OneTimeSchedule> = self
            .one_time
            .read()
            .await
            .values()
            .filter(|schedule| {
                if query
                    .bot_instance_id
                    .as_ref()
                    .is_some_and(|bot| *bot != schedule.bot_instance_id)
                {
                    return false;
                }
                let date = local_date(schedule.start_at, tz);
                if query.from_date.is_some_and(|from| date < from) {
                    return false;
                }
                if query.to_date.is_some_and(|to| date > to) {
                    return false;
                }
                true
            })
            .cloned()
            .collect();
        schedules.sort_by(|a, b| a.start_at.cmp(&b.start_at).then_with(|| a.id.cmp(&b.id)));
        schedules
    }

    /// Whether a bot already has a schedule in the given minute.
    ///
    /// Backs the duplicate guard: two runs of the same bot in the same
    /// minute are never intended.
    pub async fn minute_taken(&self, bot_instance_id: &str, key: &str, tz: Tz) -> bool {
        self.one_time
            .read()
            .await
            .values()
            .any(|schedule| {
                schedule.bot_instance_id == bot_instance_id
                    && minute_key(schedule.start_at, tz) == key
            })
    }

    /// Insert or replace a recurring schedule.
    pub async fn upsert_recurring(&self, schedule: RecurringSchedule) {
        self.recurring
            .write()
            .await
            .insert(schedule.id.clone(), schedule);
    }

    /// A recurring schedule by id.
    pub async fn get_recurring(&self, id: &str) -> Option<RecurringSchedule> {
        self.recurring.read().await.get(id).cloned()
    }

    /// Remove a recurring schedule, returning it if present.
    pub async fn remove_recurring(&self, id: &str) -> Option<RecurringSchedule> {
        self.recurring.write().await.remove(id)
    }

    /// All recurring schedules, unordered.
    pub async fn all_recurring(&self) -> Vec<RecurringSchedule> {
        self.recurring.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::Amsterdam;
    use schedule_core::policy::parse_schedule_time;

    #[tokio::test]
    async fn list_filters_by_bot_and_date_range() {
        let store = ScheduleStore::new();
        store
            .upsert(OneTimeSchedule::new(
                "bot_1",
                parse_schedule_time("2024-01-15 09:00", Amsterdam).unwrap(),
            ))
            .await;
        store
            .upsert(OneTimeSchedule::new(
                "bot_1",
                parse_schedule_time("2024-01-20 09:00", Amsterdam).unwrap(),
            ))
            .await;
        store
            .upsert(OneTimeSchedule::new(
                "bot_2",
                parse_schedule_time("2024-01-15 18:00", Amsterdam).unwrap(),
            ))
            .await;

        let query = ScheduleListQuery {
            bot_instance_id: Some("bot_1".to_string()),
            from_date: Some("2024-01-14".parse().unwrap()),
            to_date: Some("2024-01-16".parse().unwrap()),
        };
        let schedules = store.list(&query, Amsterdam).await;
        assert_eq!(schedules.len(), 1);
        assert_eq!(schedules[0].bot_instance_id, "bot_1");
    }

    #[tokio::test]
    async fn minute_guard_sees_same_minute_schedules() {
        let store = ScheduleStore::new();
        let start = parse_schedule_time("2024-01-15 09:00", Amsterdam).unwrap();
        store.upsert(OneTimeSchedule::new("bot_1", start)).await;

        assert!(
            store
                .minute_taken("bot_1", "2024-01-15-09-00", Amsterdam)
                .await
        );
        assert!(
            !store
                .minute_taken("bot_1", "2024-01-15-09-01", Amsterdam)
                .await
        );
        assert!(
            !store
                .minute_taken("bot_2", "2024-01-15-09-00", Amsterdam)
                .await
        );
    }
}
