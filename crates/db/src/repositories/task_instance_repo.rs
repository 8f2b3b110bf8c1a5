//! Repository for the `task_instances` table.

use elms_core::types::{DbId, Timestamp};
use elms_core::workflow::TaskStatus;
use sqlx::PgPool;

use crate::models::workflow::{CreateTaskInstance, TaskInstance};

const COLUMNS: &str = "id, workflow_instance_id, template_task_id, task_name, \
                        sequence_order, assigned_role, status, is_visible, \
                        assigned_user_id, due_date, completed_at, completed_by";

/// Provides queries for task instances.
pub struct TaskInstanceRepo;

impl TaskInstanceRepo {
    /// Insert the full task fan-out for a freshly initiated workflow.
    pub async fn insert_all(
        pool: &PgPool,
        inputs: &[CreateTaskInstance],
    ) -> Result<Vec<TaskInstance>, sqlx::Error> {
        let insert = format!(
            "INSERT INTO task_instances
                (workflow_instance_id, template_task_id, task_name,
                 sequence_order, assigned_role, status, is_visible)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );

        let mut rows = Vec::with_capacity(inputs.len());
        for input in inputs {
            let row = sqlx::query_as::<_, TaskInstance>(&insert)
                .bind(input.workflow_instance_id)
                .bind(input.template_task_id)
                .bind(&input.task_name)
                .bind(input.sequence_order)
                .bind(input.assigned_role)
                .bind(TaskStatus::NotStarted)
                .bind(input.is_visible)
                .fetch_one(pool)
                .await?;
            rows.push(row);
        }
        Ok(rows)
    }

    /// Find a task instance by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<TaskInstance>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM task_instances WHERE id = $1");
        sqlx::query_as::<_, TaskInstance>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a workflow's task instances in sequence order.
    pub async fn list_by_workflow(
        pool: &PgPool,
        workflow_instance_id: DbId,
    ) -> Result<Vec<TaskInstance>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM task_instances
             WHERE workflow_instance_id = $1
             ORDER BY sequence_order, id"
        );
        sqlx::query_as::<_, TaskInstance>(&query)
            .bind(workflow_instance_id)
            .fetch_all(pool)
            .await
    }

    /// Count tasks assigned to a user in the given status. Used for
    /// least-load routing.
    pub async fn count_by_user_and_status(
        pool: &PgPool,
        user_id: DbId,
        status: TaskStatus,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM task_instances
             WHERE assigned_user_id = $1 AND status = $2",
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }

    /// Count a workflow's tasks in the given status.
    pub async fn count_by_workflow_and_status(
        pool: &PgPool,
        workflow_instance_id: DbId,
        status: TaskStatus,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM task_instances
             WHERE workflow_instance_id = $1 AND status = $2",
        )
        .bind(workflow_instance_id)
        .bind(status)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }

    /// Assign a task to a user: sets the assignee, moves the task to
    /// IN_PROGRESS, and stamps the due date.
    pub async fn assign(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
        due_date: Timestamp,
    ) -> Result<Option<TaskInstance>, sqlx::Error> {
        let query = format!(
            "UPDATE task_instances
             SET assigned_user_id = $2, status = $3, due_date = $4
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskInstance>(&query)
            .bind(id)
            .bind(user_id)
            .bind(TaskStatus::InProgress)
            .bind(due_date)
            .fetch_optional(pool)
            .await
    }

    /// Update a task's status; completion stamps `completed_at`/`completed_by`.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        status: TaskStatus,
        completed_by: Option<DbId>,
    ) -> Result<Option<TaskInstance>, sqlx::Error> {
        let query = format!(
            "UPDATE task_instances
             SET status = $2,
                 completed_at = CASE WHEN $2 = 'COMPLETED' THEN NOW() ELSE completed_at END,
                 completed_by = CASE WHEN $2 = 'COMPLETED' THEN $3 ELSE completed_by END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TaskInstance>(&query)
            .bind(id)
            .bind(status)
            .bind(completed_by)
            .fetch_optional(pool)
            .await
    }
}
