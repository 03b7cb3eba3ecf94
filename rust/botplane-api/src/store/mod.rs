//! In-memory stores.
//!
//! Schedules are short-lived operational records; the registry mirrors
//! reference data owned by the bot-lifecycle service. Everything lives in
//! `Arc<RwLock<HashMap>>` maps shared between the gateway handlers and the
//! dispatcher.

pub mod registry;
pub mod runs;
pub mod schedules;

pub use registry::Registry;
pub use runs::{RunLog, RunRecord, RunSource};
pub use schedules::{ScheduleListQuery, ScheduleStore};
