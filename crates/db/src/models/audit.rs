//! Audit event rows.

use elms_core::types::{DbId, Timestamp};
use serde_json::Value;
use sqlx::FromRow;

/// Row from the `audit_events` table.
#[derive(Debug, Clone, FromRow)]
pub struct AuditEvent {
    pub id: DbId,
    pub actor_id: DbId,
    pub action: String,
    pub description: Option<String>,
    pub metadata: Option<Value>,
    pub created_at: Timestamp,
}

/// DTO for recording an audit event.
#[derive(Debug)]
pub struct CreateAuditEvent {
    pub actor_id: DbId,
    pub action: String,
    pub description: Option<String>,
    pub metadata: Option<Value>,
}
