//! Handlers for the `/tasks` resource.
//!
//! Submissions return as soon as the records exist; execution continues in
//! the background and clients poll `GET /tasks/{id}` or `GET /tasks`.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use fleet_core::error::CoreError;
use fleet_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use fleet_core::task::TaskStatus;
use fleet_core::types::DbId;
use fleet_db::models::task::{LastStatusQuery, SubmitBulkTasks, SubmitTask, TaskSearchQuery};
use fleet_db::repositories::TaskRepo;

use super::require;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/tasks
///
/// Create one task and start it. Returns 201 with the task in `queued`, or
/// 409 if the server already has a queued or running task.
pub async fn submit_task(
    State(state): State<AppState>,
    Json(input): Json<SubmitTask>,
) -> AppResult<impl IntoResponse> {
    let server_id = require("server_id", input.server_id)?;
    let script_id = require("script_id", input.script_id)?;

    let task = state.dispatcher.submit_one(server_id, script_id).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: task })))
}

/// POST /api/v1/tasks/bulk
///
/// Create one task per listed server. All servers must exist.
pub async fn submit_bulk_tasks(
    State(state): State<AppState>,
    Json(input): Json<SubmitBulkTasks>,
) -> AppResult<impl IntoResponse> {
    let script_id = require("script_id", input.script_id)?;

    let tasks = state
        .dispatcher
        .submit_bulk(script_id, &input.server_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: tasks })))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /api/v1/tasks
///
/// All tasks, newest first.
pub async fn list_tasks(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let tasks = TaskRepo::list(&state.pool).await;
    Ok(Json(DataResponse { data: tasks }))
}

/// GET /api/v1/tasks/search?status=..&limit=..&offset=..
///
/// Tasks filtered by status, newest first, one page at a time.
pub async fn search_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskSearchQuery>,
) -> AppResult<impl IntoResponse> {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(name) => Some(TaskStatus::from_name(name).ok_or_else(|| {
            AppError::BadRequest(format!("Unknown task status '{name}'"))
        })?),
    };
    let limit = clamp_limit(query.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
    let offset = clamp_offset(query.offset);

    let page = TaskRepo::search(&state.pool, status, limit, offset).await;
    Ok(Json(DataResponse { data: page }))
}

/// GET /api/v1/tasks/{id}
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let task = TaskRepo::find_by_id(&state.pool, task_id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Task",
            id: task_id,
        }))?;
    Ok(Json(DataResponse { data: task }))
}

/// GET /api/v1/tasks/status?server_id=..&script_id=..
///
/// The newest task for a server/script pair.
pub async fn last_status(
    State(state): State<AppState>,
    Query(query): Query<LastStatusQuery>,
) -> AppResult<impl IntoResponse> {
    let task = TaskRepo::latest_for_pair(&state.pool, query.server_id, query.script_id)
        .await
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Task for server",
                id: query.server_id,
            })
        })?;
    Ok(Json(DataResponse { data: task }))
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// POST /api/v1/tasks/{id}/cancel
///
/// Cancel a queued or running task. A finished task is returned unchanged.
pub async fn cancel_task(
    State(state): State<AppState>,
    Path(task_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let task = state.dispatcher.cancel(task_id).await?;
    Ok(Json(DataResponse { data: task }))
}
