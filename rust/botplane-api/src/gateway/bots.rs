//! Bot and phase reference endpoints.
//!
//! Read-only: the bot-lifecycle service owns these records. The consoles
//! fetch them here to populate the drag sources and resolve names.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use schedule_core::{BotInstance, Phase};

use crate::AppState;

/// Bot reference routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/bots", get(list_bots))
        .route("/api/v1/bots/{id}/phases", get(list_phases))
}

/// List bot instances, ordered by code.
///
/// # Endpoint
///
/// `GET /api/v1/bots`
pub async fn list_bots(State(state): State<AppState>) -> Json<Vec<BotInstance>> {
    Json(state.registry.list_bots().await)
}

/// List a bot's phases, ordered by position.
///
/// # Endpoint
///
/// `GET /api/v1/bots/{id}/phases`
pub async fn list_phases(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Phase>>, (StatusCode, String)> {
    state
        .registry
        .bot(&id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Bot instance not found".to_string()))?;
    Ok(Json(state.registry.phases_for(&id).await))
}
