//! Operator console engine for the botplane scheduling calendar.
//!
//! This crate is the interaction layer behind the scheduling calendar and
//! its flat list view, shared by the creator and agency consoles (one
//! engine, parameterized by [`scope::ConsoleScope`], instead of two forked
//! views):
//!
//! - [`board`]: The in-memory schedule collection with an explicit
//!   pending-operation state machine - optimistic inserts are confirmed
//!   against the backend's record or rolled back, never left dangling
//! - [`drag`]: Single-slot drag state; dropping a bot or phase on a
//!   calendar day materializes a schedule at 09:00 local
//! - [`clipboard`]: Copy-day / paste-day with re-query at paste time and a
//!   single-use clipboard
//! - [`client`]: The backend API collaborator behind a trait seam, with a
//!   reqwest implementation that enforces a request timeout
//! - [`notify`]: Notice sink replacing direct toast calls
//! - [`console`]: Facade wiring the pieces together, including refresh and
//!   the policy-guarded delete flow
//!
//! Everything here runs on user-interaction callbacks; there is no
//! background work. Backend failures surface as notices and never leave
//! the collection in a state the backend does not agree with.

pub mod board;
pub mod clipboard;
pub mod client;
pub mod console;
pub mod drag;
pub mod notify;
pub mod scope;

#[cfg(test)]
pub(crate) mod testing;

pub use board::{DeleteError, ScheduleBoard};
pub use clipboard::{CopyOutcome, DayClipboard, PasteOutcome};
pub use client::{ApiError, HttpScheduleApi, NewSchedule, ScheduleApi, ScheduleQuery};
pub use console::{Console, DeleteOutcome};
pub use drag::{DragController, DragSource, DropOutcome};
pub use notify::{Notice, NoticeLevel, NoticeLog, Notifier};
pub use scope::ConsoleScope;
