//! Operational endpoints.

pub mod health;

use axum::Router;

use crate::AppState;

/// Create the operational router.
pub fn create_router() -> Router<AppState> {
    health::router()
}
