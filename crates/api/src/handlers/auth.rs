//! Handlers for the `/auth` resource.
//!
//! Login applies the lockout policy (five consecutive failures lock the
//! account for fifteen minutes), refresh rotates the refresh token, and
//! logout revokes every session the user holds.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use elms_core::error::CoreError;
use elms_core::roles::UserRole;
use elms_core::types::DbId;
use serde::{Deserialize, Serialize};

use elms_db::models::session::CreateSession;
use elms_db::models::user::User;
use elms_db::repositories::{SessionRepo, UserRepo};

use crate::auth::jwt::{refresh_token_digest, RefreshToken};
use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

const MAX_FAILED_ATTEMPTS: i32 = 5;
const LOCK_DURATION_MINS: i64 = 15;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Returned by both login and refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserInfo,
}

/// The identity shape the console consumes, also served by `/auth/me`.
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub role: UserRole,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        UserInfo {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let Some(user) = UserRepo::find_by_username(&state.pool, &input.username).await? else {
        return Err(bad_credentials());
    };
    ensure_account_usable(&user)?;

    let password_ok = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_ok {
        let failures = UserRepo::register_failed_attempt(&state.pool, user.id).await?;
        if failures >= MAX_FAILED_ATTEMPTS {
            let until = Utc::now() + chrono::Duration::minutes(LOCK_DURATION_MINS);
            UserRepo::lock_account(&state.pool, user.id, until).await?;
            tracing::warn!(user_id = user.id, failures, "Account locked");
        }
        return Err(bad_credentials());
    }

    UserRepo::record_successful_login(&state.pool, user.id).await?;
    tracing::info!(user_id = user.id, "Login");

    Ok(Json(issue_session(&state, &user).await?))
}

/// POST /api/v1/auth/refresh
///
/// Rotation: the presented token's session is revoked and a new one is
/// issued, so a stolen refresh token dies the first time it is raced.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let digest = refresh_token_digest(&input.refresh_token);
    let session = SessionRepo::find_by_refresh_token_hash(&state.pool, &digest)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid or expired refresh token".into(),
            ))
        })?;

    SessionRepo::revoke(&state.pool, session.id).await?;

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;
    ensure_account_usable(&user)?;

    Ok(Json(issue_session(&state, &user).await?))
}

/// POST /api/v1/auth/logout
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<StatusCode> {
    SessionRepo::revoke_all_for_user(&state.pool, auth_user.user_id).await?;
    tracing::info!(user_id = auth_user.user_id, "Logout, sessions revoked");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
///
/// Lets the console restore its session on reload.
pub async fn me(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<Json<UserInfo>> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: auth_user.user_id,
        }))?;
    Ok(Json(UserInfo::from(&user)))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Deactivated and locked accounts are refused before any password check,
/// with 403 rather than the 401 used for bad credentials.
fn ensure_account_usable(user: &User) -> AppResult<()> {
    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }
    if let Some(locked_until) = user.locked_until {
        if locked_until > Utc::now() {
            return Err(AppError::Core(CoreError::Forbidden(
                "Account is temporarily locked. Try again later.".into(),
            )));
        }
    }
    Ok(())
}

fn bad_credentials() -> AppError {
    // One message for unknown-user and wrong-password: no username probing.
    AppError::Core(CoreError::Unauthorized(
        "Invalid username or password".into(),
    ))
}

/// Mint both tokens, persist the refresh session, and shape the response.
async fn issue_session(state: &AppState, user: &User) -> AppResult<AuthResponse> {
    let jwt = &state.config.jwt;

    let access_token = jwt
        .issue_access_token(user.id, user.role.as_str())
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;
    let refresh = RefreshToken::mint();

    SessionRepo::create(
        &state.pool,
        &CreateSession {
            user_id: user.id,
            refresh_token_hash: refresh.digest,
            expires_at: Utc::now() + chrono::Duration::days(jwt.refresh_token_expiry_days),
        },
    )
    .await?;

    Ok(AuthResponse {
        access_token,
        refresh_token: refresh.plaintext,
        expires_in: jwt.access_token_expiry_mins * 60,
        user: UserInfo::from(user),
    })
}
