//! Calendar grid and list projections over HTTP.
//!
//! Thin wrappers: the grid and row math lives in `schedule_core`; these
//! endpoints only gather the inputs.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use schedule_core::calendar::{month_grid, CalendarDay};
use schedule_core::projection::{schedule_page, ListFilter, ListPage};
use schedule_core::ScheduleStatus;

use crate::AppState;

/// Projection routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/calendar", get(calendar))
        .route("/api/v1/schedules/list", get(schedule_list))
}

/// Query parameters for the calendar grid.
#[derive(Debug, Deserialize)]
pub struct CalendarParams {
    /// Year of the month to render.
    pub year: i32,
    /// Month to render (1-12).
    pub month: u32,
}

/// The 42-cell grid for a month.
///
/// # Endpoint
///
/// `GET /api/v1/calendar?year=2024&month=1`
pub async fn calendar(
    State(state): State<AppState>,
    Query(params): Query<CalendarParams>,
) -> Result<Json<Vec<CalendarDay>>, (StatusCode, String)> {
    let schedules = state.schedules.all().await;
    let grid = month_grid(params.year, params.month, &schedules, state.tz)
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    Ok(Json(grid))
}

/// Query parameters for the flat list view.
#[derive(Debug, Deserialize)]
pub struct ScheduleListParams {
    /// Keep only rows with this status.
    #[serde(default)]
    pub status: Option<ScheduleStatus>,
    /// Keep only rows for this bot instance.
    #[serde(default)]
    pub bot_instance_id: Option<String>,
    /// Free-text search over bot code and phase name.
    #[serde(default)]
    pub q: Option<String>,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: usize,
    /// Page size.
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

fn default_page() -> usize {
    1
}

fn default_per_page() -> usize {
    50
}

/// The filtered, paginated list view.
///
/// # Endpoint
///
/// `GET /api/v1/schedules/list`
pub async fn schedule_list(
    State(state): State<AppState>,
    Query(params): Query<ScheduleListParams>,
) -> Json<ListPage> {
    let schedules = state.schedules.all().await;
    let bots = state.registry.bot_map().await;
    let phases = state.registry.phase_map().await;
    let filter = ListFilter {
        status: params.status,
        bot_instance_id: params.bot_instance_id,
        search: params.q,
    };
    Json(schedule_page(
        &schedules,
        &bots,
        &phases,
        &filter,
        params.page,
        params.per_page,
        state.tz,
    ))
}
