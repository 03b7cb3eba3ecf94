//! Day copy and paste.
//!
//! "Copy day" remembers a source **date**, not the records on it - the
//! records are re-queried at paste time, so schedules deleted in between
//! are simply gone and the paste fails softly. The clipboard is
//! single-use: a successful paste clears it, and pasting again without a
//! fresh copy is a soft failure.
//!
//! Pasted starts keep each source's local hour and minute on the target
//! date. Starts that would violate the one-hour create rule are skipped
//! and counted rather than rejected wholesale, matching the backend's
//! bulk copy-day semantics.

use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;

use schedule_core::policy::{can_create, copy_to_date};
use schedule_core::{Clock, OneTimeSchedule};

use crate::board::ScheduleBoard;
use crate::client::{NewSchedule, ScheduleApi};
use crate::notify::{Notice, Notifier};

/// Result of a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The day was copied; `count` schedules were on it.
    Copied {
        /// Schedules on the copied day at copy time.
        count: usize,
    },
    /// The day held no schedules; nothing changed.
    NothingToCopy,
}

/// Result of a paste.
#[derive(Debug, Clone, PartialEq)]
pub enum PasteOutcome {
    /// At least one schedule was created on the target day.
    Pasted {
        /// Schedules created, as confirmed by the backend.
        created: Vec<OneTimeSchedule>,
        /// Source schedules skipped by the create rule.
        skipped: usize,
    },
    /// No day has been copied.
    NothingCopied,
    /// The copied day no longer holds any schedules.
    SourceEmpty,
    /// Every source schedule was skipped or failed; the clipboard is
    /// kept so the operator can retry.
    Failed {
        /// Schedules that did get created before the failure.
        created: Vec<OneTimeSchedule>,
        /// Source schedules skipped by the create rule.
        skipped: usize,
        /// Backend calls that failed and were rolled back.
        failed: usize,
    },
}

/// The single-use day clipboard.
pub struct DayClipboard {
    copied_day: Mutex<Option<NaiveDate>>,
    board: Arc<ScheduleBoard>,
    api: Arc<dyn ScheduleApi>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for DayClipboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DayClipboard")
            .field("copied_day", &*self.copied_day.lock())
            .finish()
    }
}

impl DayClipboard {
    /// Create a clipboard over a board and its backend.
    #[must_use]
    pub fn new(
        board: Arc<ScheduleBoard>,
        api: Arc<dyn ScheduleApi>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            copied_day: Mutex::new(None),
            board,
            api,
            notifier,
            clock,
        }
    }

    /// The currently copied day, if any.
    #[must_use]
    pub fn copied_day(&self) -> Option<NaiveDate> {
        *self.copied_day.lock()
    }

    /// Copy all schedules on `date`.
    pub fn copy_day(&self, date: NaiveDate) -> CopyOutcome {
        let count = self.board.schedules_on(date).len();
        if count == 0 {
            self.notifier.notify(Notice::error("No schedules to copy"));
            return CopyOutcome::NothingToCopy;
        }

        *self.copied_day.lock() = Some(date);
        self.notifier
            .notify(Notice::success("Day copied to clipboard"));
        CopyOutcome::Copied { count }
    }

    /// Paste the copied day onto `target`.
    pub async fn paste_day(&self, target: NaiveDate) -> PasteOutcome {
        let Some(source_day) = self.copied_day() else {
            self.notifier
                .notify(Notice::info("No day on the clipboard"));
            return PasteOutcome::NothingCopied;
        };

        let sources = self.board.schedules_on(source_day);
        if sources.is_empty() {
            self.notifier.notify(Notice::error("No schedules to paste"));
            return PasteOutcome::SourceEmpty;
        }

        let tz = self.board.timezone();
        let now = self.clock.now_utc();
        let mut created = Vec::new();
        let mut skipped = 0usize;
        let mut failed = 0usize;

        for source in sources {
            let Some(start_at) = copy_to_date(source.start_at, target, tz) else {
                skipped += 1;
                continue;
            };
            if !can_create(start_at, now) {
                skipped += 1;
                continue;
            }

            let mut schedule = OneTimeSchedule::new(source.bot_instance_id.clone(), start_at);
            if let Some(ref phase_id) = source.phase_id {
                schedule = schedule.with_phase(phase_id.clone());
            }
            if let Some(ref payload) = source.payload {
                schedule = schedule.with_payload(payload.clone());
            }

            let token = self.board.begin_create(schedule);
            let request = NewSchedule {
                bot_instance_id: source.bot_instance_id.clone(),
                phase_id: source.phase_id.clone(),
                start_at,
                payload: source.payload.clone(),
            };
            match self.api.create_schedule(&request).await {
                Ok(confirmed) => {
                    self.board.confirm_create(token, confirmed.clone());
                    created.push(confirmed);
                }
                Err(error) => {
                    tracing::warn!(%error, "paste create failed, reverting");
                    self.board.roll_back_create(token);
                    failed += 1;
                }
            }
        }

        if failed > 0 || created.is_empty() {
            self.notifier.notify(Notice::error("Failed to paste day"));
            return PasteOutcome::Failed {
                created,
                skipped,
                failed,
            };
        }

        // Successful paste consumes the clipboard.
        *self.copied_day.lock() = None;
        self.notifier.notify(Notice::success("Day pasted successfully"));
        PasteOutcome::Pasted { created, skipped }
    }
}
