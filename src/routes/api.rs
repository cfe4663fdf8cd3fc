use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    error::{ApiError, Result},
    models::{AspectRatio, Style},
    services::{job_client::TaskSnapshot, DashScopeError},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/modes", get(list_modes))
        .route("/tasks/:task_id", get(task_status))
}

async fn list_modes(State(state): State<Arc<AppState>>) -> Json<Value> {
    let modes: Vec<Value> = state
        .profiles
        .iter()
        .map(|profile| {
            json!({
                "mode": profile.mode,
                "endpoint": profile.endpoint,
                "poll_interval_secs": profile.poll.interval.as_secs(),
                "max_wait_secs": profile.poll.max_wait.as_secs(),
                "default_model": profile.default_model().id,
                "models": profile.models,
            })
        })
        .collect();

    let styles: Vec<Value> = Style::ALL
        .iter()
        .map(|s| json!({ "value": s, "label": s.display_name() }))
        .collect();

    let aspect_ratios: Vec<Value> = AspectRatio::ALL
        .iter()
        .map(|r| json!({ "value": r.as_str(), "label": r.display_name() }))
        .collect();

    Json(json!({
        "modes": modes,
        "styles": styles,
        "aspect_ratios": aspect_ratios,
        "max_prompt_chars": state.config.max_prompt_chars,
    }))
}

async fn task_status(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskSnapshot>> {
    let task_id = task_id.trim();
    let well_formed = task_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if task_id.is_empty() || !well_formed {
        return Err(ApiError::InvalidRequest("malformed task id".into()));
    }

    let videos = state
        .videos
        .as_ref()
        .ok_or_else(|| ApiError::Upstream("DashScope API key is not configured".into()))?;

    match videos.query(task_id).await {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(DashScopeError::Api { status: 404, .. }) => Err(ApiError::NotFound),
        Err(e) => Err(ApiError::Upstream(e.to_string())),
    }
}
