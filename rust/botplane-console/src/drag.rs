//! Drag-and-drop schedule assignment.
//!
//! The controller holds at most one dragged source at a time: starting a
//! new drag replaces any unfinished one, and the slot clears on drop or
//! cancel. Dropping on a calendar day materializes a schedule at 09:00
//! local, subject to the one-hour create rule.

use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;

use schedule_core::policy::{can_create, default_drop_instant};
use schedule_core::{Clock, OneTimeSchedule};

use crate::board::ScheduleBoard;
use crate::client::{NewSchedule, ScheduleApi};
use crate::notify::{Notice, Notifier};

/// What is being dragged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragSource {
    /// A bot, scheduling a full run.
    Bot {
        /// Bot instance id.
        id: String,
        /// Bot code, used in notices.
        code: String,
    },
    /// A single phase of a bot.
    Phase {
        /// Phase id.
        id: String,
        /// Phase display name, used in notices.
        name: String,
    },
}

impl DragSource {
    fn display_name(&self) -> &str {
        match self {
            Self::Bot { code, .. } => code,
            Self::Phase { name, .. } => name,
        }
    }
}

/// Result of a drop.
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// A schedule was created and confirmed by the backend.
    Created(OneTimeSchedule),
    /// Nothing was being dragged; silent no-op.
    NothingDragged,
    /// The target start is less than one hour away.
    TooSoon,
    /// The dragged phase no longer exists.
    UnknownPhase,
    /// The backend refused or the call failed; the optimistic insert was
    /// rolled back.
    Failed,
}

/// Tracks the dragged item and materializes schedules on drop.
pub struct DragController {
    slot: Mutex<Option<DragSource>>,
    board: Arc<ScheduleBoard>,
    api: Arc<dyn ScheduleApi>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for DragController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragController")
            .field("slot", &*self.slot.lock())
            .finish()
    }
}

impl DragController {
    /// Create a controller over a board and its backend.
    #[must_use]
    pub fn new(
        board: Arc<ScheduleBoard>,
        api: Arc<dyn ScheduleApi>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            slot: Mutex::new(None),
            board,
            api,
            notifier,
            clock,
        }
    }

    /// Begin dragging, replacing any unfinished drag.
    pub fn begin(&self, source: DragSource) {
        *self.slot.lock() = Some(source);
    }

    /// Cancel the current drag, if any.
    pub fn cancel(&self) {
        *self.slot.lock() = None;
    }

    /// The currently dragged source, if any.
    #[must_use]
    pub fn dragged(&self) -> Option<DragSource> {
        self.slot.lock().clone()
    }

    /// Drop the dragged source on a calendar day.
    ///
    /// The slot is cleared regardless of outcome.
    pub async fn drop_on(&self, date: NaiveDate) -> DropOutcome {
        let Some(source) = self.slot.lock().take() else {
            return DropOutcome::NothingDragged;
        };

        let tz = self.board.timezone();
        let Some(start_at) = default_drop_instant(date, tz) else {
            // 09:00 fell into a DST gap; nothing sensible to create.
            self.notifier
                .notify(Notice::error("Cannot schedule at that time"));
            return DropOutcome::TooSoon;
        };
        if !can_create(start_at, self.clock.now_utc()) {
            self.notifier
                .notify(Notice::error("Cannot schedule within 1 hour of current time"));
            return DropOutcome::TooSoon;
        }

        // Phase drags schedule the phase's owning bot.
        let (bot_instance_id, phase_id) = match &source {
            DragSource::Bot { id, .. } => (id.clone(), None),
            DragSource::Phase { id, .. } => match self.board.phase(id) {
                Some(phase) => (phase.bot_instance_id, Some(phase.id)),
                None => {
                    self.notifier
                        .notify(Notice::error("That phase no longer exists"));
                    return DropOutcome::UnknownPhase;
                }
            },
        };

        let mut schedule = OneTimeSchedule::new(bot_instance_id.clone(), start_at);
        if let Some(ref phase_id) = phase_id {
            schedule = schedule.with_phase(phase_id.clone());
        }

        let token = self.board.begin_create(schedule);
        let request = NewSchedule {
            bot_instance_id,
            phase_id,
            start_at,
            payload: None,
        };
        match self.api.create_schedule(&request).await {
            Ok(confirmed) => {
                self.board.confirm_create(token, confirmed.clone());
                self.notifier.notify(Notice::success(format!(
                    "{} scheduled successfully",
                    source.display_name()
                )));
                DropOutcome::Created(confirmed)
            }
            Err(error) => {
                tracing::warn!(%error, "schedule create failed, reverting");
                self.board.roll_back_create(token);
                self.notifier
                    .notify(Notice::error("Failed to create schedule"));
                DropOutcome::Failed
            }
        }
    }
}
