//! Botplane API - the schedules backend.
//!
//! This service is the backend collaborator the operator consoles talk
//! to: bots and phases as read-only reference data, one-time schedule CRUD
//! with the lead-time rules enforced server-side, bulk day copies,
//! recurring (cron) schedules, and calendar/list projections over HTTP.
//! A dispatch loop fires due schedules.
//!
//! # Architecture
//!
//! - [`config`]: Configuration loading and validation
//! - [`store`]: In-memory stores (bot registry, schedules, run log)
//! - [`gateway`]: HTTP endpoints and rate limiting
//! - [`api`]: Health/readiness endpoints
//! - [`dispatch`]: The interval loop that fires due schedules
//!
//! State is held in memory: schedules are short-lived operational records
//! owned by the console workflows, and the run log only backs dispatch
//! idempotency.
//!
//! # Example
//!
//! ```rust,ignore
//! use botplane_api::{config::AppConfig, server::create_app};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load()?;
//!     let (app, _state) = create_app(config)?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod dispatch;
pub mod gateway;
pub mod logging;
pub mod server;
pub mod store;

use std::sync::Arc;

use chrono_tz::Tz;

use config::AppConfig;
use gateway::rate_limit::KeyedRateLimiters;
use schedule_core::Clock;
use store::{Registry, RunLog, ScheduleStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Reference timezone all wall-clock rules evaluate in.
    pub tz: Tz,
    /// Time source for the lead-time rules and the dispatcher.
    pub clock: Arc<dyn Clock>,
    /// Bot and phase reference data.
    pub registry: Arc<Registry>,
    /// One-time and recurring schedules.
    pub schedules: Arc<ScheduleStore>,
    /// Fired runs, keyed for dispatch idempotency.
    pub runs: Arc<RunLog>,
    /// Per-key request rate limiters.
    pub limiters: Arc<KeyedRateLimiters>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("tz", &self.tz)
            .field("registry", &"Registry")
            .field("schedules", &"ScheduleStore")
            .field("runs", &"RunLog")
            .finish()
    }
}
