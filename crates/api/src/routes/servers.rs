//! Route definitions for the `/servers` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::servers;
use crate::state::AppState;

/// Routes mounted at `/servers`.
///
/// ```text
/// GET    /            -> list_servers
/// POST   /            -> create_server
/// GET    /{id}        -> get_server
/// PUT    /{id}        -> update_server
/// DELETE /{id}        -> delete_server
/// GET    /{id}/ping   -> ping_server
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(servers::list_servers).post(servers::create_server))
        .route(
            "/{id}",
            get(servers::get_server)
                .put(servers::update_server)
                .delete(servers::delete_server),
        )
        .route("/{id}/ping", get(servers::ping_server))
}
