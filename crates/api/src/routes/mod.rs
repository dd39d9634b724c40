pub mod groups;
pub mod health;
pub mod scripts;
pub mod servers;
pub mod stats;
pub mod tasks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /tasks                                   list, submit
/// /tasks/bulk                              submit to many servers (POST)
/// /tasks/search?status&limit&offset        filter by status, paged
/// /tasks/status?server_id&script_id        newest task for a pair
/// /tasks/{id}                              get
/// /tasks/{id}/cancel                       cancel (POST)
///
/// /groups                                  list, create
/// /groups/{id}                             get, delete
/// /groups/{id}/servers/{server_id}         add, remove member
/// /groups/{id}/execute                     fan a script out (POST)
/// /groups/{id}/status/last                 tasks fanned out from the group
/// /groups/{id}/ping                        probe every member
///
/// /servers?hostname                        list (optionally by hostname), register
/// /servers/{id}                            get, update, delete
/// /servers/{id}/ping                       probe one server
///
/// /scripts                                 list, create
/// /scripts/{id}                            get, delete
///
/// /stats                                   execution counters
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/tasks", tasks::router())
        .nest("/groups", groups::router())
        .nest("/servers", servers::router())
        .nest("/scripts", scripts::router())
        .nest("/stats", stats::router())
}
