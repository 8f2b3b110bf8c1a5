//! Routes under `/auth`.
//!
//! ```text
//! POST /login     authenticate, returns token pair
//! POST /refresh   rotate a refresh token
//! POST /logout    revoke the caller's sessions
//! GET  /me        current identity
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}
