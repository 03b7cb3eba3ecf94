//! One-time schedule endpoints.
//!
//! CRUD plus the bulk day copy. The lead-time rules are enforced here,
//! not only in the console: a client that skips the UI still cannot
//! create a schedule inside the hour or delete one inside ten minutes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use schedule_core::policy::{
    can_create, can_delete, copy_to_date, minute_key, parse_schedule_time,
};
use schedule_core::{OneTimeSchedule, ScheduleStatus};

use crate::store::ScheduleListQuery;
use crate::AppState;

/// Schedule routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/schedules",
            get(list_schedules).post(create_schedule),
        )
        .route(
            "/api/v1/schedules/{id}",
            get(get_schedule)
                .patch(update_schedule)
                .delete(delete_schedule),
        )
        .route("/api/v1/schedules/copy-day", post(copy_day))
}

/// Request to create a schedule.
#[derive(Debug, Deserialize)]
pub struct CreateScheduleRequest {
    /// Target bot instance.
    pub bot_instance_id: String,
    /// Phase to run; absent for a full run.
    #[serde(default)]
    pub phase_id: Option<String>,
    /// Start as `YYYY-MM-DD HH:MM` local time.
    pub start_at: String,
    /// Opaque runner payload.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// Request to update a schedule.
#[derive(Debug, Deserialize)]
pub struct UpdateScheduleRequest {
    /// New start as `YYYY-MM-DD HH:MM` local time.
    #[serde(default)]
    pub start_at: Option<String>,
    /// Replacement runner payload.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
}

/// Query parameters for listing schedules.
#[derive(Debug, Deserialize)]
pub struct ListSchedulesParams {
    /// Restrict to one bot instance.
    #[serde(default)]
    pub bot_instance_id: Option<String>,
    /// Inclusive start date (`YYYY-MM-DD`, reference timezone).
    #[serde(default)]
    pub from_date: Option<NaiveDate>,
    /// Inclusive end date (`YYYY-MM-DD`, reference timezone).
    #[serde(default)]
    pub to_date: Option<NaiveDate>,
}

/// Schedule response.
#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    /// Schedule id.
    pub id: String,
    /// Target bot instance.
    pub bot_instance_id: String,
    /// Phase, when the schedule targets one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase_id: Option<String>,
    /// Start instant (RFC 3339).
    pub start_at: String,
    /// End of the run window, if set (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_at: Option<String>,
    /// Current status.
    pub status: ScheduleStatus,
    /// Runner payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Dispatch instant, once fired (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatched_at: Option<String>,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Last update timestamp (RFC 3339).
    pub updated_at: String,
}

impl From<OneTimeSchedule> for ScheduleResponse {
    fn from(schedule: OneTimeSchedule) -> Self {
        Self {
            id: schedule.id,
            bot_instance_id: schedule.bot_instance_id,
            phase_id: schedule.phase_id,
            start_at: schedule.start_at.to_rfc3339(),
            end_at: schedule.end_at.map(|dt| dt.to_rfc3339()),
            status: schedule.status,
            payload: schedule.payload,
            dispatched_at: schedule.dispatched_at.map(|dt| dt.to_rfc3339()),
            created_at: schedule.created_at.to_rfc3339(),
            updated_at: schedule.updated_at.to_rfc3339(),
        }
    }
}

/// Copy-day request.
#[derive(Debug, Deserialize)]
pub struct CopyDayRequest {
    /// Bot whose day is copied.
    pub bot_instance_id: String,
    /// Source date (`YYYY-MM-DD`).
    pub from_date: String,
    /// Target date (`YYYY-MM-DD`).
    pub to_date: String,
}

/// Copy-day response.
#[derive(Debug, Serialize)]
pub struct CopyDayResponse {
    /// Schedules created on the target day.
    pub copied_count: usize,
    /// Schedules skipped (lead-time rule, duplicates, DST gaps).
    pub skipped_count: usize,
}

/// List schedules within an optional bot/date range.
///
/// # Endpoint
///
/// `GET /api/v1/schedules`
pub async fn list_schedules(
    State(state): State<AppState>,
    Query(params): Query<ListSchedulesParams>,
) -> Json<Vec<ScheduleResponse>> {
    let query = ScheduleListQuery {
        bot_instance_id: params.bot_instance_id,
        from_date: params.from_date,
        to_date: params.to_date,
    };
    let schedules = state.schedules.list(&query, state.tz).await;
    Json(schedules.into_iter().map(Into::into).collect())
}

/// Get a schedule by id.
///
/// # Endpoint
///
/// `GET /api/v1/schedules/{id}`
pub async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let schedule = state
        .schedules
        .get(&id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Schedule not found".to_string()))?;
    Ok(Json(ScheduleResponse::from(schedule)))
}

/// Create a schedule.
///
/// # Endpoint
///
/// `POST /api/v1/schedules`
pub async fn create_schedule(
    State(state): State<AppState>,
    Json(req): Json<CreateScheduleRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let bot = state
        .registry
        .bot(&req.bot_instance_id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Bot instance not found".to_string()))?;

    let start_at = parse_schedule_time(&req.start_at, state.tz).map_err(|e| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Invalid start_at: {e}"),
        )
    })?;

    // Phase schedules must reference a phase of the same bot.
    if let Some(ref phase_id) = req.phase_id {
        state
            .registry
            .phase(phase_id)
            .await
            .filter(|phase| phase.bot_instance_id == bot.id)
            .ok_or_else(|| (StatusCode::NOT_FOUND, "Phase not found".to_string()))?;
    }

    let now = state.clock.now_utc();
    if !can_create(start_at, now) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "Schedule must be created at least 1 hour in advance".to_string(),
        ));
    }

    let key = minute_key(start_at, state.tz);
    if state.schedules.minute_taken(&bot.id, &key, state.tz).await {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "A run is already scheduled for this bot at this time".to_string(),
        ));
    }

    let mut schedule = OneTimeSchedule::new(bot.id, start_at);
    if let Some(phase_id) = req.phase_id {
        schedule = schedule.with_phase(phase_id);
    }
    if let Some(payload) = req.payload {
        schedule = schedule.with_payload(payload);
    }
    state.schedules.upsert(schedule.clone()).await;

    tracing::info!(schedule_id = %schedule.id, bot = %schedule.bot_instance_id, "schedule created");
    Ok((StatusCode::CREATED, Json(ScheduleResponse::from(schedule))))
}

/// Update a schedule's start and/or payload.
///
/// # Endpoint
///
/// `PATCH /api/v1/schedules/{id}`
pub async fn update_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateScheduleRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut schedule = state
        .schedules
        .get(&id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Schedule not found".to_string()))?;

    let now = state.clock.now_utc();
    if let Some(ref start_str) = req.start_at {
        let new_start = parse_schedule_time(start_str, state.tz).map_err(|e| {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Invalid start_at: {e}"),
            )
        })?;

        // A moved schedule is a new commitment: recheck the create rule.
        if new_start != schedule.start_at {
            if !can_create(new_start, now) {
                return Err((
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "Updated schedule must be at least 1 hour in advance".to_string(),
                ));
            }
            schedule.reschedule(new_start, now);
        }
    }
    if let Some(payload) = req.payload {
        schedule.payload = Some(payload);
        schedule.updated_at = now;
    }

    state.schedules.upsert(schedule.clone()).await;
    Ok(Json(ScheduleResponse::from(schedule)))
}

/// Delete a schedule, subject to the ten-minute rule.
///
/// # Endpoint
///
/// `DELETE /api/v1/schedules/{id}`
pub async fn delete_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let schedule = state
        .schedules
        .get(&id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Schedule not found".to_string()))?;

    if !can_delete(schedule.start_at, state.clock.now_utc()) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "Schedule can only be deleted at least 10 minutes before start time".to_string(),
        ));
    }

    state.schedules.remove(&id).await;
    tracing::info!(schedule_id = %id, "schedule deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Copy all of one bot's schedules from one day to another.
///
/// Skips (and counts) entries that would land inside the hour, collide
/// with an existing same-minute schedule, or fall into a DST gap.
///
/// # Endpoint
///
/// `POST /api/v1/schedules/copy-day`
pub async fn copy_day(
    State(state): State<AppState>,
    Json(req): Json<CopyDayRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let bot = state
        .registry
        .bot(&req.bot_instance_id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Bot instance not found".to_string()))?;

    let parse_date = |raw: &str| -> Result<NaiveDate, (StatusCode, String)> {
        raw.parse().map_err(|_| {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Invalid date format. Use YYYY-MM-DD".to_string(),
            )
        })
    };
    let from_date = parse_date(&req.from_date)?;
    let to_date = parse_date(&req.to_date)?;

    let sources = state
        .schedules
        .list(
            &ScheduleListQuery {
                bot_instance_id: Some(bot.id.clone()),
                from_date: Some(from_date),
                to_date: Some(from_date),
            },
            state.tz,
        )
        .await;

    let now = state.clock.now_utc();
    let mut copied_count = 0usize;
    let mut skipped_count = 0usize;

    for source in sources {
        let Some(new_start) = copy_to_date(source.start_at, to_date, state.tz) else {
            skipped_count += 1;
            continue;
        };
        if !can_create(new_start, now) {
            skipped_count += 1;
            continue;
        }
        let key = minute_key(new_start, state.tz);
        if state.schedules.minute_taken(&bot.id, &key, state.tz).await {
            skipped_count += 1;
            continue;
        }

        let mut schedule = OneTimeSchedule::new(bot.id.clone(), new_start);
        if let Some(phase_id) = source.phase_id {
            schedule = schedule.with_phase(phase_id);
        }
        if let Some(payload) = source.payload {
            schedule = schedule.with_payload(payload);
        }
        state.schedules.upsert(schedule).await;
        copied_count += 1;
    }

    tracing::info!(
        bot = %bot.id,
        from = %from_date,
        to = %to_date,
        copied = copied_count,
        skipped = skipped_count,
        "day copied"
    );
    Ok(Json(CopyDayResponse {
        copied_count,
        skipped_count,
    }))
}
