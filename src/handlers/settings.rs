use axum::extract::rejection::JsonRejection;
use axum::{extract::State, Json};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::settings::{Settings, SettingsPatch};
use crate::state::AppState;
use crate::store::SettingsRepository;

// GET /api/settings and /admin/settings
#[instrument(skip(state))]
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Settings>, AppError> {
    Ok(Json(state.store.get_settings().await?))
}

// PUT /admin/settings - partial update
#[instrument(skip(state, payload))]
pub async fn update_settings(
    State(state): State<AppState>,
    payload: Result<Json<SettingsPatch>, JsonRejection>,
) -> Result<Json<Settings>, AppError> {
    let Json(payload) = payload?;
    let settings = state.store.update_settings(payload).await?;
    info!("Settings updated");
    Ok(Json(settings))
}
