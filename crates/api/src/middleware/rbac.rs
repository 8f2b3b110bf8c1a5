//! Role gates layered on top of [`AuthUser`].
//!
//! A handler states its access rule by the extractor it takes:
//! [`RequireAuth`] for any signed-in user, [`RequireTemplateEditor`] for
//! the template-authoring roles, [`RequireHrAdmin`] for workflow
//! initiation. Failing the gate is a 403 before the handler body runs.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use elms_core::error::CoreError;
use elms_core::roles::UserRole;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Any authenticated user.
pub struct RequireAuth(pub AuthUser);

/// HR Admin or Administrator: the roles allowed to author templates and
/// manage accounts.
pub struct RequireTemplateEditor(pub AuthUser);

/// HR Admin only: the role that initiates workflows.
pub struct RequireHrAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        AuthUser::from_request_parts(parts, state)
            .await
            .map(RequireAuth)
    }
}

impl FromRequestParts<AppState> for RequireTemplateEditor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.role.can_edit_templates() {
            return Err(forbidden("HR Admin or Administrator role required"));
        }
        Ok(RequireTemplateEditor(user))
    }
}

impl FromRequestParts<AppState> for RequireHrAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != UserRole::HrAdmin {
            return Err(forbidden("HR Admin role required"));
        }
        Ok(RequireHrAdmin(user))
    }
}

fn forbidden(msg: &str) -> AppError {
    AppError::Core(CoreError::Forbidden(msg.into()))
}
