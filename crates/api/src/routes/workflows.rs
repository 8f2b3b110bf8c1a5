//! Route definitions for workflow instances.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::workflows;
use crate::state::AppState;

/// Routes mounted at `/workflows`.
///
/// ```text
/// GET  /                    -> list_workflows (?status= filters)
/// POST /                    -> initiate_workflow (HR Admin)
/// GET  /{id}                -> get_workflow
/// PUT  /{id}/status         -> update_workflow_status
/// PUT  /tasks/{id}/status   -> update_task_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(workflows::list_workflows).post(workflows::initiate_workflow),
        )
        .route("/{id}", get(workflows::get_workflow))
        .route("/{id}/status", put(workflows::update_workflow_status))
        .route("/tasks/{id}/status", put(workflows::update_task_status))
}
