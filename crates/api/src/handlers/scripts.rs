//! Handlers for the `/scripts` resource.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use fleet_core::error::CoreError;
use fleet_core::types::DbId;
use fleet_core::validation::{validate_name, validate_script_content};
use fleet_db::models::script::CreateScript;
use fleet_db::repositories::ScriptRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/scripts
pub async fn create_script(
    State(state): State<AppState>,
    Json(input): Json<CreateScript>,
) -> AppResult<impl IntoResponse> {
    validate_name("Script", &input.name)?;
    validate_script_content(&input.content)?;

    let script = ScriptRepo::create(&state.pool, &input).await;
    tracing::info!(script_id = script.id, name = %script.name, "Script created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: script })))
}

/// GET /api/v1/scripts
pub async fn list_scripts(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let scripts = ScriptRepo::list(&state.pool).await;
    Ok(Json(DataResponse { data: scripts }))
}

/// GET /api/v1/scripts/{id}
pub async fn get_script(
    State(state): State<AppState>,
    Path(script_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let script = ScriptRepo::find_by_id(&state.pool, script_id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Script",
            id: script_id,
        }))?;
    Ok(Json(DataResponse { data: script }))
}

/// DELETE /api/v1/scripts/{id}
pub async fn delete_script(
    State(state): State<AppState>,
    Path(script_id): Path<DbId>,
) -> AppResult<StatusCode> {
    if ScriptRepo::delete(&state.pool, script_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Script",
            id: script_id,
        }))
    }
}
