pub mod auth;
pub mod health;
pub mod templates;
pub mod users;
pub mod workflows;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                      login (public)
/// /auth/refresh                    refresh (public)
/// /auth/logout                     logout (requires auth)
/// /auth/me                         current user (requires auth)
///
/// /users                           list, create (HR Admin / Administrator)
/// /users/{id}                      get, update, deactivate
/// /users/{id}/change-password      change password
///
/// /templates                       list, create (HR Admin / Administrator)
/// /templates/{id}                  get, update, soft delete
///
/// /workflows                       list (auth), initiate (HR Admin)
/// /workflows/{id}                  detail (auth)
/// /workflows/{id}/status           status transition (auth)
/// /workflows/tasks/{id}/status     task status transition (auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/templates", templates::router())
        .nest("/workflows", workflows::router())
}
