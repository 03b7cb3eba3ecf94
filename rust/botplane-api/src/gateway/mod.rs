//! HTTP gateway - schedule CRUD, reference data, projections, rate
//! limiting.

pub mod bots;
pub mod calendar;
pub mod rate_limit;
pub mod recurring;
pub mod schedules;

use axum::Router;

use crate::AppState;

/// Create the gateway router with all gateway routes.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(schedules::router())
        .merge(recurring::router())
        .merge(bots::router())
        .merge(calendar::router())
}
