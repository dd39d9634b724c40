//! Route definitions for the `/tasks` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::tasks;
use crate::state::AppState;

/// Routes mounted at `/tasks`.
///
/// ```text
/// GET    /                -> list_tasks
/// POST   /                -> submit_task
/// POST   /bulk            -> submit_bulk_tasks
/// GET    /search          -> search_tasks
/// GET    /status          -> last_status
/// GET    /{id}            -> get_task
/// POST   /{id}/cancel     -> cancel_task
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(tasks::list_tasks).post(tasks::submit_task))
        .route("/bulk", post(tasks::submit_bulk_tasks))
        .route("/search", get(tasks::search_tasks))
        .route("/status", get(tasks::last_status))
        .route("/{id}", get(tasks::get_task))
        .route("/{id}/cancel", post(tasks::cancel_task))
}
