//! Route definitions for the `/groups` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::groups;
use crate::state::AppState;

/// Routes mounted at `/groups`.
///
/// ```text
/// GET    /                          -> list_groups
/// POST   /                          -> create_group
/// GET    /{id}                      -> get_group
/// DELETE /{id}                      -> delete_group
/// POST   /{id}/servers/{server_id}  -> add_server
/// DELETE /{id}/servers/{server_id}  -> remove_server
/// POST   /{id}/execute              -> execute_group
/// GET    /{id}/status/last          -> last_tasks
/// GET    /{id}/ping                 -> ping_group
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(groups::list_groups).post(groups::create_group))
        .route("/{id}", get(groups::get_group).delete(groups::delete_group))
        .route(
            "/{id}/servers/{server_id}",
            post(groups::add_server).delete(groups::remove_server),
        )
        .route("/{id}/execute", post(groups::execute_group))
        .route("/{id}/status/last", get(groups::last_tasks))
        .route("/{id}/ping", get(groups::ping_group))
}
