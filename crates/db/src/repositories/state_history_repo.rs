//! Repository for the `workflow_state_history` table.

use elms_core::types::DbId;
use sqlx::PgPool;

use crate::models::workflow::{CreateStateHistory, WorkflowStateHistory};

const COLUMNS: &str = "id, workflow_instance_id, previous_status, new_status, \
                        changed_by, changed_at, notes";

/// Append-only audit trail of workflow status transitions.
pub struct StateHistoryRepo;

impl StateHistoryRepo {
    /// Append a state transition record.
    pub async fn create(
        pool: &PgPool,
        input: &CreateStateHistory,
    ) -> Result<WorkflowStateHistory, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflow_state_history
                (workflow_instance_id, previous_status, new_status, changed_by, notes)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkflowStateHistory>(&query)
            .bind(input.workflow_instance_id)
            .bind(input.previous_status)
            .bind(input.new_status)
            .bind(input.changed_by)
            .bind(&input.notes)
            .fetch_one(pool)
            .await
    }

    /// List a workflow's history oldest first.
    pub async fn list_by_workflow(
        pool: &PgPool,
        workflow_instance_id: DbId,
    ) -> Result<Vec<WorkflowStateHistory>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workflow_state_history
             WHERE workflow_instance_id = $1
             ORDER BY changed_at, id"
        );
        sqlx::query_as::<_, WorkflowStateHistory>(&query)
            .bind(workflow_instance_id)
            .fetch_all(pool)
            .await
    }
}
