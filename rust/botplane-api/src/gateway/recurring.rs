//! Recurring (cron) schedule endpoints.
//!
//! The recurring list page operates on these; the calendar never does.
//! Expressions are validated on write and evaluated in the reference
//! timezone.

use std::str::FromStr;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use schedule_core::projection::{recurring_rows, RecurringRow};
use schedule_core::{CronExpr, RecurringSchedule};

use crate::AppState;

/// Recurring schedule routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/recurring-schedules",
            get(list_recurring).post(create_recurring),
        )
        .route("/api/v1/recurring-schedules/rows", get(recurring_list_rows))
        .route(
            "/api/v1/recurring-schedules/{id}",
            get(get_recurring)
                .patch(update_recurring)
                .delete(delete_recurring),
        )
}

/// Request to create a recurring schedule.
#[derive(Debug, Deserialize)]
pub struct CreateRecurringRequest {
    /// Target bot instance.
    pub bot_instance_id: String,
    /// Phase to run; absent for a full run.
    #[serde(default)]
    pub phase_id: Option<String>,
    /// Five-field cron expression.
    pub cron_expr: String,
    /// Opaque runner payload.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// Request to update a recurring schedule.
#[derive(Debug, Deserialize)]
pub struct UpdateRecurringRequest {
    /// New cron expression.
    #[serde(default)]
    pub cron_expr: Option<String>,
    /// Enable or disable firing.
    #[serde(default)]
    pub is_active: Option<bool>,
    /// Replacement runner payload.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// Recurring schedule response.
#[derive(Debug, Serialize)]
pub struct RecurringResponse {
    /// Schedule id.
    pub id: String,
    /// Target bot instance.
    pub bot_instance_id: String,
    /// Phase, when the schedule targets one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<String>,
    /// Cron expression.
    pub cron_expr: String,
    /// Whether the dispatcher fires this schedule.
    pub is_active: bool,
    /// Next planned fire (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_fire_at: Option<String>,
    /// Last fire (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fired_at: Option<String>,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Last update timestamp (RFC 3339).
    pub updated_at: String,
}

impl From<RecurringSchedule> for RecurringResponse {
    fn from(schedule: RecurringSchedule) -> Self {
        Self {
            id: schedule.id,
            bot_instance_id: schedule.bot_instance_id,
            phase_id: schedule.phase_id,
            cron_expr: schedule.cron_expr,
            is_active: schedule.is_active,
            next_fire_at: schedule.next_fire_at.map(|dt| dt.to_rfc3339()),
            last_fired_at: schedule.last_fired_at.map(|dt| dt.to_rfc3339()),
            created_at: schedule.created_at.to_rfc3339(),
            updated_at: schedule.updated_at.to_rfc3339(),
        }
    }
}

/// List recurring schedules.
///
/// # Endpoint
///
/// `GET /api/v1/recurring-schedules`
pub async fn list_recurring(State(state): State<AppState>) -> Json<Vec<RecurringResponse>> {
    let mut schedules = state.schedules.all_recurring().await;
    schedules.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Json(schedules.into_iter().map(Into::into).collect())
}

/// Display rows for the recurring list page.
///
/// # Endpoint
///
/// `GET /api/v1/recurring-schedules/rows`
pub async fn recurring_list_rows(State(state): State<AppState>) -> Json<Vec<RecurringRow>> {
    let schedules = state.schedules.all_recurring().await;
    let bots = state.registry.bot_map().await;
    let phases = state.registry.phase_map().await;
    Json(recurring_rows(&schedules, &bots, &phases, state.tz))
}

/// Get a recurring schedule by id.
///
/// # Endpoint
///
/// `GET /api/v1/recurring-schedules/{id}`
pub async fn get_recurring(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let schedule = state
        .schedules
        .get_recurring(&id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Schedule not found".to_string()))?;
    Ok(Json(RecurringResponse::from(schedule)))
}

/// Create a recurring schedule.
///
/// # Endpoint
///
/// `POST /api/v1/recurring-schedules`
pub async fn create_recurring(
    State(state): State<AppState>,
    Json(req): Json<CreateRecurringRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let bot = state
        .registry
        .bot(&req.bot_instance_id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Bot instance not found".to_string()))?;

    if let Some(ref phase_id) = req.phase_id {
        state
            .registry
            .phase(phase_id)
            .await
            .filter(|phase| phase.bot_instance_id == bot.id)
            .ok_or_else(|| (StatusCode::NOT_FOUND, "Phase not found".to_string()))?;
    }

    let expr = CronExpr::from_str(&req.cron_expr).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid cron expression: {e}"),
        )
    })?;

    let now = state.clock.now_utc();
    let mut schedule =
        RecurringSchedule::new(bot.id, req.cron_expr.clone(), expr.next_after(now, state.tz));
    if let Some(phase_id) = req.phase_id {
        schedule = schedule.with_phase(phase_id);
    }
    schedule.payload = req.payload;
    state.schedules.upsert_recurring(schedule.clone()).await;

    tracing::info!(schedule_id = %schedule.id, cron = %schedule.cron_expr, "recurring schedule created");
    Ok((
        StatusCode::CREATED,
        Json(RecurringResponse::from(schedule)),
    ))
}

/// Update a recurring schedule.
///
/// # Endpoint
///
/// `PATCH /api/v1/recurring-schedules/{id}`
pub async fn update_recurring(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateRecurringRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut schedule = state
        .schedules
        .get_recurring(&id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Schedule not found".to_string()))?;

    let now = state.clock.now_utc();
    if let Some(cron_expr) = req.cron_expr {
        let expr = CronExpr::from_str(&cron_expr).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Invalid cron expression: {e}"),
            )
        })?;
        schedule.cron_expr = cron_expr;
        schedule.next_fire_at = expr.next_after(now, state.tz);
    }
    if let Some(is_active) = req.is_active {
        schedule.is_active = is_active;
        // Re-plan when a dormant schedule wakes up.
        if is_active && schedule.next_fire_at.is_none() {
            if let Ok(expr) = CronExpr::from_str(&schedule.cron_expr) {
                schedule.next_fire_at = expr.next_after(now, state.tz);
            }
        }
    }
    if let Some(payload) = req.payload {
        schedule.payload = Some(payload);
    }
    schedule.updated_at = now;

    state.schedules.upsert_recurring(schedule.clone()).await;
    Ok(Json(RecurringResponse::from(schedule)))
}

/// Delete a recurring schedule.
///
/// # Endpoint
///
/// `DELETE /api/v1/recurring-schedules/{id}`
pub async fn delete_recurring(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if state.schedules.remove_recurring(&id).await.is_some() {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Schedule not found".to_string()))
    }
}
