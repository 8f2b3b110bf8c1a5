//! Refresh-token sessions.

use elms_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// One issued refresh token. The plaintext never touches this table;
/// `refresh_token_hash` is its SHA-256 digest.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: DbId,
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    pub revoked_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Insert DTO written at login and on each refresh rotation.
#[derive(Debug)]
pub struct CreateSession {
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
}
