//! Core domain entities.

pub mod bots;
pub mod phases;
pub mod schedules;

pub use bots::{BotInstance, BotStatus, ValidationStatus};
pub use phases::Phase;
pub use schedules::{OneTimeSchedule, RecurringSchedule, ScheduleStatus};
