//! Repository for the `audit_events` table.

use elms_core::types::DbId;
use sqlx::PgPool;

use crate::models::audit::{AuditEvent, CreateAuditEvent};

const COLUMNS: &str = "id, actor_id, action, description, metadata, created_at";

/// Append-only audit log of administrative actions.
pub struct AuditRepo;

impl AuditRepo {
    /// Record an audit event.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAuditEvent,
    ) -> Result<AuditEvent, sqlx::Error> {
        let query = format!(
            "INSERT INTO audit_events (actor_id, action, description, metadata)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AuditEvent>(&query)
            .bind(input.actor_id)
            .bind(&input.action)
            .bind(&input.description)
            .bind(&input.metadata)
            .fetch_one(pool)
            .await
    }

    /// List events for an actor, newest first.
    pub async fn list_by_actor(pool: &PgPool, actor_id: DbId) -> Result<Vec<AuditEvent>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM audit_events WHERE actor_id = $1 ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, AuditEvent>(&query)
            .bind(actor_id)
            .fetch_all(pool)
            .await
    }
}
