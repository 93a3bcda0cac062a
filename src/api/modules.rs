use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::HostToken;
use crate::core::state::AppState;
use crate::schemas::module_config::{
    ConfigureResponse, DisclosureResponse, ModuleConfigResponse, ModuleConfigUpdate,
};
use crate::services::module_settings::{ConfigureOutcome, ModuleSettings, ModuleSettingsUpdate};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:course_module_id/config", get(get_config).put(put_config))
        .route("/:course_module_id/disclosure", get(get_disclosure))
}

async fn get_config(
    _host: HostToken,
    State(state): State<AppState>,
    Path(course_module_id): Path<i64>,
) -> Result<Json<ModuleConfigResponse>, ApiError> {
    let config = state
        .store()
        .get_module_config(course_module_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load module config"))?
        .ok_or_else(|| ApiError::NotFound("Module config not found".to_string()))?;

    Ok(Json(ModuleConfigResponse::from_db(config)))
}

async fn put_config(
    _host: HostToken,
    State(state): State<AppState>,
    Path(course_module_id): Path<i64>,
    Json(payload): Json<ModuleConfigUpdate>,
) -> Result<Json<ConfigureResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let actor = state
        .host()
        .user_profile(payload.actor_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load acting user"))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let update = ModuleSettingsUpdate {
        use_detection: payload.use_detection,
        show_student_results: payload.show_student_results,
    };
    let outcome =
        ModuleSettings::new(&state).configure_module(course_module_id, &actor, &update).await?;

    let config = state
        .store()
        .get_module_config(course_module_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load module config"))?;

    let outcome = match outcome {
        ConfigureOutcome::Created => "created",
        ConfigureOutcome::Updated => "updated",
        ConfigureOutcome::Unchanged => "unchanged",
    };

    Ok(Json(ConfigureResponse { outcome, config: config.map(ModuleConfigResponse::from_db) }))
}

async fn get_disclosure(
    _host: HostToken,
    State(state): State<AppState>,
    Path(course_module_id): Path<i64>,
) -> Json<DisclosureResponse> {
    let disclosure = ModuleSettings::new(&state).disclosure(course_module_id).await;
    Json(DisclosureResponse { course_module_id, disclosure })
}
