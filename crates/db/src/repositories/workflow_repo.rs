//! Repository for the `workflow_instances` table.

use elms_core::types::{DbId, Timestamp};
use elms_core::workflow::WorkflowStatus;
use sqlx::PgPool;

use crate::models::workflow::{CreateWorkflowInstance, WorkflowInstance};

const COLUMNS: &str = "id, template_id, employee_name, employee_email, employee_role, \
                        workflow_type, status, custom_field_values, initiated_by, \
                        initiated_at, completed_at";

/// Provides queries for workflow instances.
pub struct WorkflowRepo;

impl WorkflowRepo {
    /// Insert a new workflow instance in INITIATED status.
    pub async fn create(
        pool: &PgPool,
        input: &CreateWorkflowInstance,
    ) -> Result<WorkflowInstance, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflow_instances
                (template_id, employee_name, employee_email, employee_role,
                 workflow_type, status, custom_field_values, initiated_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkflowInstance>(&query)
            .bind(input.template_id)
            .bind(&input.employee_name)
            .bind(&input.employee_email)
            .bind(&input.employee_role)
            .bind(input.workflow_type)
            .bind(WorkflowStatus::Initiated)
            .bind(&input.custom_field_values)
            .bind(input.initiated_by)
            .fetch_one(pool)
            .await
    }

    /// Find a workflow instance by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<WorkflowInstance>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workflow_instances WHERE id = $1");
        sqlx::query_as::<_, WorkflowInstance>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List workflow instances, newest first, optionally filtered by status.
    pub async fn list(
        pool: &PgPool,
        status: Option<WorkflowStatus>,
    ) -> Result<Vec<WorkflowInstance>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workflow_instances
             WHERE ($1::TEXT IS NULL OR status = $1)
             ORDER BY initiated_at DESC"
        );
        sqlx::query_as::<_, WorkflowInstance>(&query)
            .bind(status)
            .fetch_all(pool)
            .await
    }

    /// Update the status, stamping `completed_at` when entering COMPLETED.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: WorkflowStatus,
        completed_at: Option<Timestamp>,
    ) -> Result<Option<WorkflowInstance>, sqlx::Error> {
        let query = format!(
            "UPDATE workflow_instances
             SET status = $2, completed_at = COALESCE($3, completed_at)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkflowInstance>(&query)
            .bind(id)
            .bind(status)
            .bind(completed_at)
            .fetch_optional(pool)
            .await
    }
}
