//! The in-memory schedule board.
//!
//! Holds the bot/phase reference data and the schedule collection the
//! calendar and list views render, filtered to the console's scope.
//!
//! Mutations are never bare inserts: every optimistic change is tracked as
//! a pending operation that the calling controller must either confirm
//! (swapping in the backend's authoritative record) or roll back. The
//! board therefore only ever shows state the backend has agreed to, plus
//! explicitly-tracked in-flight operations.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use schedule_core::calendar::{month_grid, CalendarDay, GridError};
use schedule_core::policy::{can_delete, local_date};
use schedule_core::projection::{schedule_page, ListFilter, ListPage};
use schedule_core::{BotInstance, Clock, OneTimeSchedule, Phase};
use thiserror::Error;

use crate::scope::ConsoleScope;

/// State of a tracked operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    /// Applied locally, awaiting the backend.
    Pending,
    /// Backend accepted; the local record is authoritative.
    Confirmed,
    /// Backend refused; the local change was reverted.
    RolledBack,
}

/// Kind of a tracked operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Create,
    Delete,
}

/// A tracked optimistic operation.
#[derive(Debug, Clone)]
pub struct PendingOperation {
    /// Operation id.
    pub id: String,
    /// Schedule the operation concerns.
    pub schedule_id: String,
    /// Create or delete.
    pub kind: OperationKind,
    /// Current state.
    pub state: OperationState,
}

/// Token for an in-flight optimistic create.
#[derive(Debug)]
#[must_use = "a pending create must be confirmed or rolled back"]
pub struct CreateToken {
    op_id: String,
    local_id: String,
}

/// Token for an in-flight optimistic delete. Carries the removed record
/// so a rollback can restore it.
#[derive(Debug)]
#[must_use = "a pending delete must be confirmed or rolled back"]
pub struct DeleteToken {
    op_id: String,
    removed: OneTimeSchedule,
}

impl DeleteToken {
    /// The schedule this delete removed.
    #[must_use]
    pub fn schedule(&self) -> &OneTimeSchedule {
        &self.removed
    }
}

/// Error starting a delete.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeleteError {
    /// No schedule with that id on the board.
    #[error("schedule not found")]
    NotFound,
    /// The start is less than ten minutes away.
    #[error("schedule can only be deleted at least 10 minutes before start")]
    TooClose,
}

/// The schedule collection behind the calendar and list views.
pub struct ScheduleBoard {
    scope: ConsoleScope,
    tz: Tz,
    clock: Arc<dyn Clock>,
    bots: RwLock<HashMap<String, BotInstance>>,
    phases: RwLock<HashMap<String, Phase>>,
    schedules: RwLock<HashMap<String, OneTimeSchedule>>,
    operations: Mutex<Vec<PendingOperation>>,
}

impl std::fmt::Debug for ScheduleBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleBoard")
            .field("scope", &self.scope)
            .field("tz", &self.tz)
            .field("bots", &self.bots.read().len())
            .field("schedules", &self.schedules.read().len())
            .finish()
    }
}

impl ScheduleBoard {
    /// Create an empty board for a scope.
    #[must_use]
    pub fn new(scope: ConsoleScope, tz: Tz, clock: Arc<dyn Clock>) -> Self {
        Self {
            scope,
            tz,
            clock,
            bots: RwLock::new(HashMap::new()),
            phases: RwLock::new(HashMap::new()),
            schedules: RwLock::new(HashMap::new()),
            operations: Mutex::new(Vec::new()),
        }
    }

    /// Reference timezone the board buckets dates in.
    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Replace the bot reference data, keeping only bots in scope.
    pub fn load_bots(&self, bots: impl IntoIterator<Item = BotInstance>) {
        let in_scope: HashMap<String, BotInstance> = bots
            .into_iter()
            .filter(|bot| self.scope.includes(bot))
            .map(|bot| (bot.id.clone(), bot))
            .collect();
        *self.bots.write() = in_scope;
    }

    /// Replace the phase reference data, keeping only phases of in-scope
    /// bots.
    pub fn load_phases(&self, phases: impl IntoIterator<Item = Phase>) {
        let bots = self.bots.read();
        let in_scope: HashMap<String, Phase> = phases
            .into_iter()
            .filter(|phase| bots.contains_key(&phase.bot_instance_id))
            .map(|phase| (phase.id.clone(), phase))
            .collect();
        drop(bots);
        *self.phases.write() = in_scope;
    }

    /// Replace the schedule collection, keeping only schedules of
    /// in-scope bots.
    pub fn load_schedules(&self, schedules: impl IntoIterator<Item = OneTimeSchedule>) {
        let bots = self.bots.read();
        let in_scope: HashMap<String, OneTimeSchedule> = schedules
            .into_iter()
            .filter(|schedule| bots.contains_key(&schedule.bot_instance_id))
            .map(|schedule| (schedule.id.clone(), schedule))
            .collect();
        drop(bots);
        *self.schedules.write() = in_scope;
    }

    /// Bots in scope, ordered by code.
    #[must_use]
    pub fn bots(&self) -> Vec<BotInstance> {
        let mut bots: Vec<BotInstance> = self.bots.read().values().cloned().collect();
        bots.sort_by(|a, b| a.bot_code.cmp(&b.bot_code).then_with(|| a.id.cmp(&b.id)));
        bots
    }

    /// Bots that may be dragged onto the calendar.
    #[must_use]
    pub fn schedulable_bots(&self) -> Vec<BotInstance> {
        self.bots()
            .into_iter()
            .filter(BotInstance::is_schedulable)
            .collect()
    }

    /// Look up a bot by id.
    #[must_use]
    pub fn bot(&self, id: &str) -> Option<BotInstance> {
        self.bots.read().get(id).cloned()
    }

    /// Phases in scope, ordered by bot then position.
    #[must_use]
    pub fn phases(&self) -> Vec<Phase> {
        let mut phases: Vec<Phase> = self.phases.read().values().cloned().collect();
        phases.sort_by(|a, b| {
            a.bot_instance_id
                .cmp(&b.bot_instance_id)
                .then_with(|| a.order_no.cmp(&b.order_no))
        });
        phases
    }

    /// Look up a phase by id.
    #[must_use]
    pub fn phase(&self, id: &str) -> Option<Phase> {
        self.phases.read().get(id).cloned()
    }

    /// A schedule by id.
    #[must_use]
    pub fn schedule(&self, id: &str) -> Option<OneTimeSchedule> {
        self.schedules.read().get(id).cloned()
    }

    /// Number of schedules on the board.
    #[must_use]
    pub fn len(&self) -> usize {
        self.schedules.read().len()
    }

    /// Whether the board holds no schedules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.schedules.read().is_empty()
    }

    /// Schedules whose start falls on `date` in the reference timezone,
    /// ordered by start.
    #[must_use]
    pub fn schedules_on(&self, date: NaiveDate) -> Vec<OneTimeSchedule> {
        let mut day: Vec<OneTimeSchedule> = self
            .schedules
            .read()
            .values()
            .filter(|schedule| local_date(schedule.start_at, self.tz) == date)
            .cloned()
            .collect();
        day.sort_by(|a, b| a.start_at.cmp(&b.start_at).then_with(|| a.id.cmp(&b.id)));
        day
    }

    /// The 42-cell grid for a month over the current collection.
    pub fn month_grid(&self, year: i32, month: u32) -> Result<Vec<CalendarDay>, GridError> {
        let schedules: Vec<OneTimeSchedule> = self.schedules.read().values().cloned().collect();
        month_grid(year, month, &schedules, self.tz)
    }

    /// The flat list view over the current collection.
    #[must_use]
    pub fn list_page(&self, filter: &ListFilter, page: usize, per_page: usize) -> ListPage {
        let schedules: Vec<OneTimeSchedule> = self.schedules.read().values().cloned().collect();
        schedule_page(
            &schedules,
            &self.bots.read(),
            &self.phases.read(),
            filter,
            page,
            per_page,
            self.tz,
        )
    }

    /// Insert a schedule optimistically and start tracking the create.
    pub fn begin_create(&self, schedule: OneTimeSchedule) -> CreateToken {
        let token = CreateToken {
            op_id: Uuid::new_v4().to_string(),
            local_id: schedule.id.clone(),
        };
        self.schedules
            .write()
            .insert(schedule.id.clone(), schedule);
        self.operations.lock().push(PendingOperation {
            id: token.op_id.clone(),
            schedule_id: token.local_id.clone(),
            kind: OperationKind::Create,
            state: OperationState::Pending,
        });
        token
    }

    /// Swap the optimistic record for the backend's authoritative one.
    pub fn confirm_create(&self, token: CreateToken, confirmed: OneTimeSchedule) {
        let mut schedules = self.schedules.write();
        schedules.remove(&token.local_id);
        schedules.insert(confirmed.id.clone(), confirmed);
        drop(schedules);
        self.finish_operation(&token.op_id, OperationState::Confirmed);
    }

    /// Revert an optimistic create after a backend failure.
    pub fn roll_back_create(&self, token: CreateToken) {
        self.schedules.write().remove(&token.local_id);
        self.finish_operation(&token.op_id, OperationState::RolledBack);
        tracing::warn!(schedule_id = %token.local_id, "rolled back optimistic create");
    }

    /// Remove a schedule optimistically, enforcing the delete rule.
    pub fn begin_delete(&self, schedule_id: &str) -> Result<DeleteToken, DeleteError> {
        let now = self.clock.now_utc();
        let mut schedules = self.schedules.write();
        let schedule = schedules.get(schedule_id).ok_or(DeleteError::NotFound)?;
        if !can_delete(schedule.start_at, now) {
            return Err(DeleteError::TooClose);
        }
        let removed = schedules.remove(schedule_id).ok_or(DeleteError::NotFound)?;
        drop(schedules);

        let token = DeleteToken {
            op_id: Uuid::new_v4().to_string(),
            removed,
        };
        self.operations.lock().push(PendingOperation {
            id: token.op_id.clone(),
            schedule_id: schedule_id.to_string(),
            kind: OperationKind::Delete,
            state: OperationState::Pending,
        });
        Ok(token)
    }

    /// Finish a delete the backend accepted.
    pub fn confirm_delete(&self, token: DeleteToken) {
        self.finish_operation(&token.op_id, OperationState::Confirmed);
    }

    /// Restore a schedule whose delete the backend refused.
    pub fn roll_back_delete(&self, token: DeleteToken) {
        let DeleteToken { op_id, removed } = token;
        tracing::warn!(schedule_id = %removed.id, "rolled back optimistic delete");
        self.schedules.write().insert(removed.id.clone(), removed);
        self.finish_operation(&op_id, OperationState::RolledBack);
    }

    /// Snapshot of tracked operations, oldest first.
    #[must_use]
    pub fn operations(&self) -> Vec<PendingOperation> {
        self.operations.lock().clone()
    }

    fn finish_operation(&self, op_id: &str, state: OperationState) {
        let mut operations = self.operations.lock();
        if let Some(op) = operations.iter_mut().find(|op| op.id == op_id) {
            op.state = state;
        }
    }
}
