//! Handlers for the `/servers` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use fleet_core::error::CoreError;
use fleet_core::types::DbId;
use fleet_core::validation::{
    validate_address, validate_hostname, validate_port, validate_username,
};
use fleet_db::models::server::{CreateServer, ServerListQuery, UpdateServer};
use fleet_db::repositories::{GroupRepo, ServerRepo};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/servers
pub async fn create_server(
    State(state): State<AppState>,
    Json(input): Json<CreateServer>,
) -> AppResult<impl IntoResponse> {
    validate_hostname(&input.hostname)?;
    validate_address(&input.ip_address)?;
    if let Some(port) = input.port {
        validate_port(port)?;
    }
    if let Some(username) = &input.username {
        validate_username(username)?;
    }

    let server = ServerRepo::create(&state.pool, &input).await?;
    tracing::info!(server_id = server.id, hostname = %server.hostname, "Server registered");
    Ok((StatusCode::CREATED, Json(DataResponse { data: server })))
}

/// GET /api/v1/servers
///
/// All servers, or only those named exactly `?hostname=`.
pub async fn list_servers(
    State(state): State<AppState>,
    Query(query): Query<ServerListQuery>,
) -> AppResult<impl IntoResponse> {
    let servers = match query.hostname.as_deref().map(str::trim) {
        Some(hostname) if !hostname.is_empty() => {
            ServerRepo::list_by_hostname(&state.pool, hostname).await
        }
        _ => ServerRepo::list(&state.pool).await,
    };
    Ok(Json(DataResponse { data: servers }))
}

/// GET /api/v1/servers/{id}
pub async fn get_server(
    State(state): State<AppState>,
    Path(server_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let server = ServerRepo::find_by_id(&state.pool, server_id)
        .await
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Server",
            id: server_id,
        }))?;
    Ok(Json(DataResponse { data: server }))
}

/// PUT /api/v1/servers/{id}
///
/// Partial update. Tasks already dispatched keep the connection details
/// they were started with.
pub async fn update_server(
    State(state): State<AppState>,
    Path(server_id): Path<DbId>,
    Json(input): Json<UpdateServer>,
) -> AppResult<impl IntoResponse> {
    if let Some(hostname) = &input.hostname {
        validate_hostname(hostname)?;
    }
    if let Some(address) = &input.ip_address {
        validate_address(address)?;
    }
    if let Some(port) = input.port {
        validate_port(port)?;
    }
    if let Some(username) = &input.username {
        validate_username(username)?;
    }

    let server = ServerRepo::update(&state.pool, server_id, &input).await?;
    tracing::info!(server_id, hostname = %server.hostname, "Server updated");
    Ok(Json(DataResponse { data: server }))
}

/// DELETE /api/v1/servers/{id}
///
/// Also removes the server from every group. Existing tasks are kept.
pub async fn delete_server(
    State(state): State<AppState>,
    Path(server_id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !ServerRepo::delete(&state.pool, server_id).await {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Server",
            id: server_id,
        }));
    }
    GroupRepo::remove_server_everywhere(&state.pool, server_id).await;
    tracing::info!(server_id, "Server deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/servers/{id}/ping
pub async fn ping_server(
    State(state): State<AppState>,
    Path(server_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let result = state.connectivity.ping_server(server_id).await?;
    Ok(Json(DataResponse { data: result }))
}
