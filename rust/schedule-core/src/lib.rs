//! Scheduling domain for the botplane control plane.
//!
//! This crate holds everything about bot schedules that can be expressed as
//! pure data and pure functions, shared by the operator console engine and
//! the HTTP service:
//!
//! - [`domain`]: Core entities (bot instances, phases, one-time and
//!   recurring schedules)
//! - [`calendar`]: The 42-cell month grid the scheduling calendar renders
//! - [`policy`]: Lead-time rules, dispatch windows, and day-copy time math
//! - [`cron`]: Five-field cron evaluation for recurring schedules
//! - [`projection`]: Display-ready rows with filtering and pagination
//! - [`clock`]: Injected time source so rules never race wall-clock time
//!   in tests
//!
//! No I/O happens here. All instants are stored as UTC; anything that
//! depends on a calendar date or wall-clock time takes the reference
//! timezone explicitly.

pub mod calendar;
pub mod clock;
pub mod cron;
pub mod domain;
pub mod policy;
pub mod projection;

pub use calendar::{month_grid, CalendarDay, GridError, GRID_CELLS};
pub use clock::{Clock, FixedClock, SystemClock};
pub use cron::{CronError, CronExpr};
pub use domain::{
    BotInstance, BotStatus, OneTimeSchedule, Phase, RecurringSchedule, ScheduleStatus,
    ValidationStatus,
};
pub use policy::{can_create, can_delete, is_within_dispatch_window};
