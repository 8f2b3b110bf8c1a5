//! Handlers for the `/users` resource (account management).
//!
//! All handlers require the HR Admin or Administrator role via
//! [`RequireTemplateEditor`]. Username/email uniqueness is checked
//! explicitly before insert so conflicts surface as a clean 409 with an
//! "already exists" message rather than a constraint-violation string.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use elms_core::error::CoreError;
use elms_core::roles::UserRole;
use elms_core::types::DbId;
use serde::Deserialize;
use serde_json::json;

use elms_db::models::audit::CreateAuditEvent;
use elms_db::models::user::{CreateUser, UpdateUser, UserResponse};
use elms_db::repositories::{AuditRepo, SessionRepo, UserRepo};

use crate::auth::password::{enforce_password_policy, hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireTemplateEditor;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /users`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

/// Request body for `PUT /users/{id}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

/// Request body for `POST /users/{id}/change-password`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/users
///
/// Create a new user. Checks username/email uniqueness, validates password
/// strength, hashes it, records an audit event, and returns 201 Created.
pub async fn create_user(
    State(state): State<AppState>,
    RequireTemplateEditor(admin): RequireTemplateEditor,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<UserResponse>)> {
    tracing::info!(username = %input.username, "Creating user");

    if UserRepo::find_by_username(&state.pool, &input.username)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(
            "Username already exists".into(),
        )));
    }

    if UserRepo::find_by_email(&state.pool, &input.email)
        .await?
        .is_some()
    {
        return Err(AppError::Core(CoreError::Conflict(
            "Email already exists".into(),
        )));
    }

    enforce_password_policy(&input.password)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let hashed = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let create_dto = CreateUser {
        username: input.username,
        email: input.email,
        password_hash: hashed,
        role: input.role,
    };

    let user = UserRepo::create(&state.pool, &create_dto).await?;

    AuditRepo::create(
        &state.pool,
        &CreateAuditEvent {
            actor_id: admin.user_id,
            action: "USER_CREATED".into(),
            description: Some(format!("User '{}' created", user.username)),
            metadata: Some(json!({
                "username": user.username,
                "email": user.email,
                "role": user.role.as_str(),
            })),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// GET /api/v1/users
///
/// List all users.
pub async fn list_users(
    State(state): State<AppState>,
    RequireTemplateEditor(_admin): RequireTemplateEditor,
) -> AppResult<Json<Vec<UserResponse>>> {
    let users = UserRepo::list(&state.pool).await?;
    let responses: Vec<UserResponse> = users.iter().map(UserResponse::from).collect();
    Ok(Json(responses))
}

/// GET /api/v1/users/{id}
///
/// Get a single user by ID.
pub async fn get_user(
    State(state): State<AppState>,
    RequireTemplateEditor(_admin): RequireTemplateEditor,
    Path(id): Path<DbId>,
) -> AppResult<Json<UserResponse>> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;
    Ok(Json(UserResponse::from(&user)))
}

/// PUT /api/v1/users/{id}
///
/// Update a user's profile fields (not password). A changed email must
/// remain unique.
pub async fn update_user(
    State(state): State<AppState>,
    RequireTemplateEditor(admin): RequireTemplateEditor,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUserRequest>,
) -> AppResult<Json<UserResponse>> {
    if let Some(email) = &input.email {
        if let Some(existing) = UserRepo::find_by_email(&state.pool, email).await? {
            if existing.id != id {
                return Err(AppError::Core(CoreError::Conflict(
                    "Email already exists".into(),
                )));
            }
        }
    }

    let update_dto = UpdateUser {
        email: input.email,
        role: input.role,
        is_active: input.is_active,
    };

    let user = UserRepo::update(&state.pool, id, &update_dto)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;

    AuditRepo::create(
        &state.pool,
        &CreateAuditEvent {
            actor_id: admin.user_id,
            action: "USER_UPDATED".into(),
            description: Some(format!("User '{}' updated", user.username)),
            metadata: None,
        },
    )
    .await?;

    Ok(Json(UserResponse::from(&user)))
}

/// DELETE /api/v1/users/{id}
///
/// Soft-deactivate a user and revoke their sessions. Returns 204.
pub async fn deactivate_user(
    State(state): State<AppState>,
    RequireTemplateEditor(admin): RequireTemplateEditor,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deactivated = UserRepo::deactivate(&state.pool, id).await?;
    if !deactivated {
        return Err(AppError::Core(CoreError::NotFound { entity: "User", id }));
    }

    SessionRepo::revoke_all_for_user(&state.pool, id).await?;

    AuditRepo::create(
        &state.pool,
        &CreateAuditEvent {
            actor_id: admin.user_id,
            action: "USER_DEACTIVATED".into(),
            description: Some(format!("User {id} deactivated")),
            metadata: None,
        },
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/users/{id}/change-password
///
/// Change a user's password after verifying the current one.
pub async fn change_password(
    State(state): State<AppState>,
    RequireTemplateEditor(_admin): RequireTemplateEditor,
    Path(id): Path<DbId>,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    let user = UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "User", id }))?;

    let current_valid = verify_password(&input.current_password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !current_valid {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Current password is incorrect".into(),
        )));
    }

    enforce_password_policy(&input.new_password)
        .map_err(|msg| AppError::Core(CoreError::Validation(msg)))?;

    let hashed = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    UserRepo::update_password(&state.pool, id, &hashed).await?;

    // Force re-authentication everywhere after a password change.
    SessionRepo::revoke_all_for_user(&state.pool, id).await?;

    Ok(Json(json!({ "message": "Password changed successfully" })))
}
