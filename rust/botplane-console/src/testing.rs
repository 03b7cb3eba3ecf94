//! In-memory backend used by the unit tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use chrono_tz::Tz;
use parking_lot::Mutex;

use schedule_core::policy::local_date;
use schedule_core::OneTimeSchedule;

use crate::client::{
    ApiError, CopyDayOutcome, NewSchedule, ScheduleApi, ScheduleChange, ScheduleQuery,
};

/// Backend double: accepts everything unless told to fail.
pub(crate) struct MockScheduleApi {
    tz: Tz,
    schedules: Mutex<Vec<OneTimeSchedule>>,
    fail_creates: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MockScheduleApi {
    pub(crate) fn new(tz: Tz) -> Self {
        Self {
            tz,
            schedules: Mutex::new(Vec::new()),
            fail_creates: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    pub(crate) fn fail_creates(&self) {
        self.fail_creates.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub(crate) fn stored(&self) -> Vec<OneTimeSchedule> {
        self.schedules.lock().clone()
    }

    fn rejected() -> ApiError {
        ApiError::Rejected {
            status: 500,
            message: "backend unavailable".to_string(),
        }
    }
}

#[async_trait]
impl ScheduleApi for MockScheduleApi {
    async fn list_schedules(&self, query: &ScheduleQuery) -> Result<Vec<OneTimeSchedule>, ApiError> {
        let schedules = self.schedules.lock();
        Ok(schedules
            .iter()
            .filter(|schedule| {
                query
                    .bot_instance_id
                    .as_ref()
                    .is_none_or(|bot| *bot == schedule.bot_instance_id)
            })
            .cloned()
            .collect())
    }

    async fn create_schedule(&self, new: &NewSchedule) -> Result<OneTimeSchedule, ApiError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        // The backend assigns its own id.
        let mut schedule = OneTimeSchedule::new(new.bot_instance_id.clone(), new.start_at);
        if let Some(ref phase_id) = new.phase_id {
            schedule = schedule.with_phase(phase_id.clone());
        }
        if let Some(ref payload) = new.payload {
            schedule = schedule.with_payload(payload.clone());
        }
        self.schedules.lock().push(schedule.clone());
        Ok(schedule)
    }

    async fn update_schedule(
        &self,
        id: &str,
        change: &ScheduleChange,
    ) -> Result<OneTimeSchedule, ApiError> {
        let mut schedules = self.schedules.lock();
        let schedule = schedules
            .iter_mut()
            .find(|schedule| schedule.id == id)
            .ok_or_else(|| ApiError::Rejected {
                status: 404,
                message: "schedule not found".to_string(),
            })?;
        if let Some(start_at) = change.start_at {
            schedule.start_at = start_at;
        }
        if let Some(ref payload) = change.payload {
            schedule.payload = Some(payload.clone());
        }
        Ok(schedule.clone())
    }

    async fn delete_schedule(&self, id: &str) -> Result<(), ApiError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Self::rejected());
        }
        self.schedules.lock().retain(|schedule| schedule.id != id);
        Ok(())
    }

    async fn copy_day(
        &self,
        bot_instance_id: &str,
        from_date: NaiveDate,
        _to_date: NaiveDate,
    ) -> Result<CopyDayOutcome, ApiError> {
        let copied_count = self
            .schedules
            .lock()
            .iter()
            .filter(|schedule| {
                schedule.bot_instance_id == bot_instance_id
                    && local_date(schedule.start_at, self.tz) == from_date
            })
            .count();
        Ok(CopyDayOutcome {
            copied_count,
            skipped_count: 0,
        })
    }
}
