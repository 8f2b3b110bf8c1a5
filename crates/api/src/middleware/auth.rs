//! Bearer-token authentication extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use elms_core::error::CoreError;
use elms_core::roles::UserRole;
use elms_core::types::DbId;

use crate::error::AppError;
use crate::state::AppState;

/// The caller's identity, proven by a valid access token.
///
/// Adding `AuthUser` as a handler parameter is what makes a route require
/// authentication; the token is checked before the handler body runs.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: DbId,
    pub role: UserRole,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;

        let claims = state
            .config
            .jwt
            .decode_access_token(token)
            .map_err(|_| unauthorized("Invalid or expired token"))?;

        // The role travels in the token; an unknown name means the token
        // was minted by a different build and cannot be trusted.
        let role = UserRole::parse(&claims.role)
            .ok_or_else(|| unauthorized("Unknown role in token"))?;

        Ok(AuthUser {
            user_id: claims.sub,
            role,
        })
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    parts
        .headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| unauthorized("Missing Authorization header"))?
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized("Authorization header must be 'Bearer <token>'"))
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.into()))
}
