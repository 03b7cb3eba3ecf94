//! Console facade.
//!
//! Wires the board, drag controller, and clipboard over one backend
//! client and one notice sink. Both the creator and agency consoles are
//! this type; the [`ConsoleScope`] decides what they see.

use std::sync::Arc;

use chrono::NaiveDate;
use chrono_tz::Tz;

use schedule_core::{BotInstance, Clock, Phase};

use crate::board::{DeleteError, ScheduleBoard};
use crate::client::{ApiError, CopyDayOutcome, ScheduleApi, ScheduleQuery};
use crate::clipboard::DayClipboard;
use crate::drag::DragController;
use crate::notify::{Notice, Notifier};
use crate::scope::ConsoleScope;

/// Result of a delete attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Deleted locally and confirmed by the backend.
    Deleted,
    /// The start is less than ten minutes away; nothing changed.
    TooClose,
    /// No such schedule.
    NotFound,
    /// The backend refused; the schedule was restored.
    Failed,
}

/// One scheduling console: calendar, list, drag, clipboard.
pub struct Console {
    board: Arc<ScheduleBoard>,
    /// Drag-and-drop assignment.
    pub drag: DragController,
    /// Day copy/paste.
    pub clipboard: DayClipboard,
    api: Arc<dyn ScheduleApi>,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").field("board", &self.board).finish()
    }
}

impl Console {
    /// Build a console for a scope.
    #[must_use]
    pub fn new(
        scope: ConsoleScope,
        tz: Tz,
        clock: Arc<dyn Clock>,
        api: Arc<dyn ScheduleApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let board = Arc::new(ScheduleBoard::new(scope, tz, Arc::clone(&clock)));
        let drag = DragController::new(
            Arc::clone(&board),
            Arc::clone(&api),
            Arc::clone(&notifier),
            Arc::clone(&clock),
        );
        let clipboard = DayClipboard::new(
            Arc::clone(&board),
            Arc::clone(&api),
            Arc::clone(&notifier),
            Arc::clone(&clock),
        );
        Self {
            board,
            drag,
            clipboard,
            api,
            notifier,
        }
    }

    /// The board behind this console.
    #[must_use]
    pub fn board(&self) -> &Arc<ScheduleBoard> {
        &self.board
    }

    /// Load bot and phase reference data (owned by the bot-lifecycle
    /// service, fetched by the shell).
    pub fn load_reference(
        &self,
        bots: impl IntoIterator<Item = BotInstance>,
        phases: impl IntoIterator<Item = Phase>,
    ) {
        self.board.load_bots(bots);
        self.board.load_phases(phases);
    }

    /// Re-fetch the schedule collection from the backend.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        match self.api.list_schedules(&ScheduleQuery::default()).await {
            Ok(schedules) => {
                self.board.load_schedules(schedules);
                Ok(())
            }
            Err(error) => {
                tracing::warn!(%error, "schedule refresh failed");
                self.notifier
                    .notify(Notice::error("Failed to load schedule data"));
                Err(error)
            }
        }
    }

    /// Delete a schedule, subject to the ten-minute rule.
    ///
    /// The removal is optimistic: the backend's refusal restores the
    /// schedule.
    pub async fn delete_schedule(&self, id: &str) -> DeleteOutcome {
        let token = match self.board.begin_delete(id) {
            Ok(token) => token,
            Err(DeleteError::NotFound) => {
                self.notifier.notify(Notice::error("Schedule not found"));
                return DeleteOutcome::NotFound;
            }
            Err(DeleteError::TooClose) => {
                self.notifier.notify(Notice::error(
                    "Cannot delete schedule within 10 minutes of start time",
                ));
                return DeleteOutcome::TooClose;
            }
        };

        match self.api.delete_schedule(id).await {
            Ok(()) => {
                self.board.confirm_delete(token);
                self.notifier
                    .notify(Notice::success("Schedule deleted successfully"));
                DeleteOutcome::Deleted
            }
            Err(error) => {
                tracing::warn!(%error, "schedule delete failed, restoring");
                self.board.roll_back_delete(token);
                self.notifier
                    .notify(Notice::error("Failed to delete schedule"));
                DeleteOutcome::Failed
            }
        }
    }

    /// Bulk-copy one bot's day through the backend (the agency console's
    /// per-client copy), then refresh.
    pub async fn copy_day_remote(
        &self,
        bot_instance_id: &str,
        from_date: NaiveDate,
        to_date: NaiveDate,
    ) -> Result<CopyDayOutcome, ApiError> {
        let outcome = self
            .api
            .copy_day(bot_instance_id, from_date, to_date)
            .await?;
        self.notifier.notify(Notice::success(format!(
            "Copied {} schedule(s), skipped {}",
            outcome.copied_count, outcome.skipped_count
        )));
        self.refresh().await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use chrono_tz::Europe::Amsterdam;

    use schedule_core::policy::parse_schedule_time;
    use schedule_core::{FixedClock, OneTimeSchedule, ScheduleStatus, ValidationStatus};

    use crate::drag::{DragSource, DropOutcome};
    use crate::clipboard::{CopyOutcome, PasteOutcome};
    use crate::notify::{NoticeLevel, NoticeLog};
    use crate::testing::MockScheduleApi;

    struct Fixture {
        console: Console,
        api: Arc<MockScheduleApi>,
        notices: Arc<NoticeLog>,
        clock: Arc<FixedClock>,
    }

    /// Console for `user_1` with the clock pinned to the given local time.
    fn fixture(now_local: &str) -> Fixture {
        let clock = Arc::new(FixedClock::at(
            parse_schedule_time(now_local, Amsterdam).unwrap(),
        ));
        let api = Arc::new(MockScheduleApi::new(Amsterdam));
        let notices = Arc::new(NoticeLog::new());
        let console = Console::new(
            ConsoleScope::creator("user_1"),
            Amsterdam,
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::clone(&api) as Arc<dyn ScheduleApi>,
            Arc::clone(&notices) as Arc<dyn Notifier>,
        );
        console.load_reference(
            [
                BotInstance::new("bot_1", "f2f_post", "user_1")
                    .with_validation(ValidationStatus::Valid),
                BotInstance::new("bot_2", "f2f_dm", "user_1")
                    .with_validation(ValidationStatus::Valid),
                BotInstance::new("bot_4", "of_dm", "user_1")
                    .with_validation(ValidationStatus::Valid),
            ],
            [
                Phase::new("phase_2", "Evening DM", "bot_2", 1),
                Phase::new("phase_3", "Weekend Special", "bot_4", 1),
            ],
        );
        Fixture {
            console,
            api,
            notices,
            clock,
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn dropping_a_bot_creates_a_nine_oclock_full_run() {
        let fx = fixture("2024-01-15 08:00");
        fx.console.drag.begin(DragSource::Bot {
            id: "bot_1".to_string(),
            code: "f2f_post".to_string(),
        });

        let outcome = fx.console.drag.drop_on(date("2024-01-16")).await;
        let DropOutcome::Created(created) = outcome else {
            panic!("expected a created schedule, got {outcome:?}");
        };

        assert_eq!(created.bot_instance_id, "bot_1");
        assert!(created.phase_id.is_none());
        assert_eq!(created.status, ScheduleStatus::Scheduled);

        let local = created.start_at.with_timezone(&Amsterdam);
        assert_eq!(local.date_naive(), date("2024-01-16"));
        assert_eq!((local.hour(), local.minute(), local.second()), (9, 0, 0));

        assert_eq!(fx.console.board().len(), 1);
        assert_eq!(fx.api.stored().len(), 1);
        assert_eq!(fx.notices.last().unwrap().level, NoticeLevel::Success);
    }

    #[tokio::test]
    async fn dropping_a_phase_schedules_its_owning_bot() {
        let fx = fixture("2024-01-15 08:00");
        // phase_3 belongs to bot_4, not the first or last bot listed.
        fx.console.drag.begin(DragSource::Phase {
            id: "phase_3".to_string(),
            name: "Weekend Special".to_string(),
        });

        let outcome = fx.console.drag.drop_on(date("2024-01-20")).await;
        let DropOutcome::Created(created) = outcome else {
            panic!("expected a created schedule, got {outcome:?}");
        };
        assert_eq!(created.bot_instance_id, "bot_4");
        assert_eq!(created.phase_id.as_deref(), Some("phase_3"));
    }

    #[tokio::test]
    async fn dropping_with_nothing_dragged_is_a_silent_noop() {
        let fx = fixture("2024-01-15 08:00");
        let outcome = fx.console.drag.drop_on(date("2024-01-16")).await;
        assert_eq!(outcome, DropOutcome::NothingDragged);
        assert!(fx.console.board().is_empty());
        assert!(fx.notices.last().is_none());
    }

    #[tokio::test]
    async fn dropping_inside_the_hour_is_rejected() {
        // 08:30 now; a drop today targets 09:00, only 30 minutes away.
        let fx = fixture("2024-01-15 08:30");
        fx.console.drag.begin(DragSource::Bot {
            id: "bot_1".to_string(),
            code: "f2f_post".to_string(),
        });

        let outcome = fx.console.drag.drop_on(date("2024-01-15")).await;
        assert_eq!(outcome, DropOutcome::TooSoon);
        assert!(fx.console.board().is_empty());
        assert!(fx.api.stored().is_empty());
        assert_eq!(fx.notices.last().unwrap().level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn exactly_one_hour_ahead_is_allowed() {
        // 08:00 now; 09:00 today is exactly the one-hour boundary.
        let fx = fixture("2024-01-15 08:00");
        fx.console.drag.begin(DragSource::Bot {
            id: "bot_1".to_string(),
            code: "f2f_post".to_string(),
        });

        let outcome = fx.console.drag.drop_on(date("2024-01-15")).await;
        assert!(matches!(outcome, DropOutcome::Created(_)));
    }

    #[tokio::test]
    async fn failed_create_is_rolled_back() {
        let fx = fixture("2024-01-15 08:00");
        fx.api.fail_creates();
        fx.console.drag.begin(DragSource::Bot {
            id: "bot_1".to_string(),
            code: "f2f_post".to_string(),
        });

        let outcome = fx.console.drag.drop_on(date("2024-01-16")).await;
        assert_eq!(outcome, DropOutcome::Failed);
        assert!(fx.console.board().is_empty());
        assert_eq!(fx.notices.last().unwrap().level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn copying_an_empty_day_changes_nothing() {
        let fx = fixture("2024-01-15 08:00");
        let outcome = fx.console.clipboard.copy_day(date("2024-01-16"));
        assert_eq!(outcome, CopyOutcome::NothingToCopy);
        assert!(fx.console.clipboard.copied_day().is_none());
        assert_eq!(fx.notices.last().unwrap().level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn paste_recreates_the_day_preserving_times_and_linkage() {
        let fx = fixture("2024-01-15 08:00");
        let board = fx.console.board();
        board.load_schedules([
            OneTimeSchedule::new(
                "bot_1",
                parse_schedule_time("2024-01-20 09:00", Amsterdam).unwrap(),
            ),
            OneTimeSchedule::new(
                "bot_2",
                parse_schedule_time("2024-01-20 18:30", Amsterdam).unwrap(),
            )
            .with_phase("phase_2"),
        ]);

        assert_eq!(
            fx.console.clipboard.copy_day(date("2024-01-20")),
            CopyOutcome::Copied { count: 2 }
        );

        let outcome = fx.console.clipboard.paste_day(date("2024-01-25")).await;
        let PasteOutcome::Pasted { created, skipped } = outcome else {
            panic!("expected a paste, got {outcome:?}");
        };
        assert_eq!(created.len(), 2);
        assert_eq!(skipped, 0);

        let mut times: Vec<(String, Option<String>, u32, u32)> = created
            .iter()
            .map(|schedule| {
                let local = schedule.start_at.with_timezone(&Amsterdam);
                assert_eq!(local.date_naive(), date("2024-01-25"));
                (
                    schedule.bot_instance_id.clone(),
                    schedule.phase_id.clone(),
                    local.hour(),
                    local.minute(),
                )
            })
            .collect();
        times.sort();
        assert_eq!(
            times,
            vec![
                ("bot_1".to_string(), None, 9, 0),
                ("bot_2".to_string(), Some("phase_2".to_string()), 18, 30),
            ]
        );

        // Fresh ids, and the originals are untouched.
        let source_ids: Vec<String> = board
            .schedules_on(date("2024-01-20"))
            .iter()
            .map(|schedule| schedule.id.clone())
            .collect();
        assert_eq!(source_ids.len(), 2);
        for schedule in &created {
            assert!(!source_ids.contains(&schedule.id));
        }
        assert_eq!(board.len(), 4);
    }

    #[tokio::test]
    async fn the_clipboard_is_single_use() {
        let fx = fixture("2024-01-15 08:00");
        fx.console.board().load_schedules([OneTimeSchedule::new(
            "bot_1",
            parse_schedule_time("2024-01-20 09:00", Amsterdam).unwrap(),
        )]);

        fx.console.clipboard.copy_day(date("2024-01-20"));
        let first = fx.console.clipboard.paste_day(date("2024-01-25")).await;
        assert!(matches!(first, PasteOutcome::Pasted { .. }));
        assert!(fx.console.clipboard.copied_day().is_none());

        let second = fx.console.clipboard.paste_day(date("2024-01-26")).await;
        assert_eq!(second, PasteOutcome::NothingCopied);
        // Nothing new appeared.
        assert!(fx.console.board().schedules_on(date("2024-01-26")).is_empty());
    }

    #[tokio::test]
    async fn paste_fails_softly_when_the_source_day_was_emptied() {
        let fx = fixture("2024-01-15 08:00");
        fx.console.board().load_schedules([OneTimeSchedule::new(
            "bot_1",
            parse_schedule_time("2024-01-20 09:00", Amsterdam).unwrap(),
        )]);

        fx.console.clipboard.copy_day(date("2024-01-20"));
        // Everything on the copied day is deleted before the paste.
        fx.console.board().load_schedules([]);

        let outcome = fx.console.clipboard.paste_day(date("2024-01-25")).await;
        assert_eq!(outcome, PasteOutcome::SourceEmpty);
        assert!(fx.console.board().is_empty());
    }

    #[tokio::test]
    async fn paste_skips_starts_inside_the_hour() {
        let fx = fixture("2024-01-15 08:30");
        fx.console.board().load_schedules([
            // 08:45 local pasted onto today is 15 minutes away: skipped.
            OneTimeSchedule::new(
                "bot_1",
                parse_schedule_time("2024-01-14 08:45", Amsterdam).unwrap(),
            ),
            // 18:00 local is comfortably beyond the hour: created.
            OneTimeSchedule::new(
                "bot_2",
                parse_schedule_time("2024-01-14 18:00", Amsterdam).unwrap(),
            ),
        ]);

        fx.console.clipboard.copy_day(date("2024-01-14"));
        let outcome = fx.console.clipboard.paste_day(date("2024-01-15")).await;
        let PasteOutcome::Pasted { created, skipped } = outcome else {
            panic!("expected a paste, got {outcome:?}");
        };
        assert_eq!(created.len(), 1);
        assert_eq!(skipped, 1);
        assert_eq!(created[0].bot_instance_id, "bot_2");
    }

    #[tokio::test]
    async fn deleting_inside_ten_minutes_is_rejected_and_keeps_the_schedule() {
        let fx = fixture("2024-01-15 08:00");
        let soon = OneTimeSchedule::new(
            "bot_1",
            fx.clock.now_utc() + chrono::Duration::minutes(5),
        );
        let id = soon.id.clone();
        fx.console.board().load_schedules([soon]);

        let outcome = fx.console.delete_schedule(&id).await;
        assert_eq!(outcome, DeleteOutcome::TooClose);
        assert!(fx.console.board().schedule(&id).is_some());
        assert_eq!(fx.notices.last().unwrap().level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn failed_delete_restores_the_schedule() {
        let fx = fixture("2024-01-15 08:00");
        fx.api.fail_deletes();
        let schedule = OneTimeSchedule::new(
            "bot_1",
            parse_schedule_time("2024-01-16 09:00", Amsterdam).unwrap(),
        );
        let id = schedule.id.clone();
        fx.console.board().load_schedules([schedule]);

        let outcome = fx.console.delete_schedule(&id).await;
        assert_eq!(outcome, DeleteOutcome::Failed);
        assert!(fx.console.board().schedule(&id).is_some());
    }

    #[tokio::test]
    async fn refresh_pulls_the_backend_collection() {
        let fx = fixture("2024-01-15 08:00");
        fx.console.drag.begin(DragSource::Bot {
            id: "bot_1".to_string(),
            code: "f2f_post".to_string(),
        });
        fx.console.drag.drop_on(date("2024-01-16")).await;

        // A fresh console over the same backend sees the schedule.
        let other = Console::new(
            ConsoleScope::creator("user_1"),
            Amsterdam,
            Arc::clone(&fx.clock) as Arc<dyn Clock>,
            Arc::clone(&fx.api) as Arc<dyn ScheduleApi>,
            Arc::new(NoticeLog::new()) as Arc<dyn Notifier>,
        );
        other.load_reference(
            [BotInstance::new("bot_1", "f2f_post", "user_1")
                .with_validation(ValidationStatus::Valid)],
            [],
        );
        other.refresh().await.unwrap();
        assert_eq!(other.board().len(), 1);
    }
}
