//! Handlers for the `/groups` resource: membership, fan-out execution,
//! last-execution status, and group ping.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use fleet_core::error::CoreError;
use fleet_core::types::DbId;
use fleet_core::validation::validate_name;
use fleet_db::models::group::{CreateServerGroup, ExecuteGroup, ServerGroup};
use fleet_db::repositories::{GroupRepo, ServerRepo, TaskRepo};

use super::require;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_group(state: &AppState, group_id: DbId) -> AppResult<ServerGroup> {
    GroupRepo::find_by_id(&state.pool, group_id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ServerGroup",
            id: group_id,
        }))
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// POST /api/v1/groups
pub async fn create_group(
    State(state): State<AppState>,
    Json(input): Json<CreateServerGroup>,
) -> AppResult<impl IntoResponse> {
    validate_name("Group", &input.name)?;
    let group = GroupRepo::create(&state.pool, &input).await?;
    tracing::info!(group_id = group.id, name = %group.name, "Group created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: group })))
}

/// GET /api/v1/groups
pub async fn list_groups(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let groups = GroupRepo::list(&state.pool).await;
    Ok(Json(DataResponse { data: groups }))
}

/// GET /api/v1/groups/{id}
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let group = find_group(&state, group_id).await?;
    Ok(Json(DataResponse { data: group }))
}

/// DELETE /api/v1/groups/{id}
///
/// Tasks fanned out from the group keep their `source_group_id`.
pub async fn delete_group(
    State(state): State<AppState>,
    Path(group_id): Path<DbId>,
) -> AppResult<StatusCode> {
    if GroupRepo::delete(&state.pool, group_id).await {
        tracing::info!(group_id, "Group deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "ServerGroup",
            id: group_id,
        }))
    }
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

/// POST /api/v1/groups/{id}/servers/{server_id}
pub async fn add_server(
    State(state): State<AppState>,
    Path((group_id, server_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    if ServerRepo::find_by_id(&state.pool, server_id).await.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Server",
            id: server_id,
        }));
    }
    let group = GroupRepo::add_server(&state.pool, group_id, server_id).await?;
    Ok(Json(DataResponse { data: group }))
}

/// DELETE /api/v1/groups/{id}/servers/{server_id}
pub async fn remove_server(
    State(state): State<AppState>,
    Path((group_id, server_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let group = GroupRepo::remove_server(&state.pool, group_id, server_id).await?;
    Ok(Json(DataResponse { data: group }))
}

// ---------------------------------------------------------------------------
// Execution and status
// ---------------------------------------------------------------------------

/// POST /api/v1/groups/{id}/execute
///
/// Create one task per current member and start them all. Returns 201 with
/// the created tasks (an empty list for an empty group).
pub async fn execute_group(
    State(state): State<AppState>,
    Path(group_id): Path<DbId>,
    Json(input): Json<ExecuteGroup>,
) -> AppResult<impl IntoResponse> {
    let script_id = require("script_id", input.script_id)?;
    let tasks = state.dispatcher.execute_group(group_id, script_id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: tasks })))
}

/// GET /api/v1/groups/{id}/status/last
///
/// Every task fanned out from the group, most recent dispatch first.
pub async fn last_tasks(
    State(state): State<AppState>,
    Path(group_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_group(&state, group_id).await?;
    let tasks = TaskRepo::list_by_group(&state.pool, group_id).await;
    Ok(Json(DataResponse { data: tasks }))
}

/// GET /api/v1/groups/{id}/ping
///
/// `{ "<server id>": bool }` for every member.
pub async fn ping_group(
    State(state): State<AppState>,
    Path(group_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let results = state.connectivity.ping_group(group_id).await?;
    Ok(Json(DataResponse { data: results }))
}
