//! Repository for the `workflow_templates` table.
//!
//! Task rows are written together with their template inside one
//! transaction; see [`TemplateTaskRepo`] for the task-level queries.
//!
//! [`TemplateTaskRepo`]: crate::repositories::TemplateTaskRepo

use elms_core::template_rules::TaskDefinition;
use elms_core::types::DbId;
use sqlx::PgPool;

use crate::models::template::{
    CreateTemplate, TemplateSummary, TemplateTask, UpdateTemplate, WorkflowTemplate,
};
use crate::repositories::TemplateTaskRepo;

const COLUMNS: &str = "id, name, description, workflow_type, is_active, \
                        created_by, created_at, updated_by, updated_at";

/// Provides CRUD operations for workflow templates.
pub struct TemplateRepo;

impl TemplateRepo {
    /// Insert a template and its task list in one transaction.
    pub async fn create_with_tasks(
        pool: &PgPool,
        input: &CreateTemplate,
        tasks: &[TaskDefinition],
    ) -> Result<(WorkflowTemplate, Vec<TemplateTask>), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO workflow_templates (name, description, workflow_type, created_by, updated_by)
             VALUES ($1, $2, $3, $4, $4)
             RETURNING {COLUMNS}"
        );
        let template = sqlx::query_as::<_, WorkflowTemplate>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.workflow_type)
            .bind(input.created_by)
            .fetch_one(&mut *tx)
            .await?;

        let rows = TemplateTaskRepo::insert_all(&mut tx, template.id, tasks).await?;

        tx.commit().await?;
        Ok((template, rows))
    }

    /// Update a template's own fields and replace its task list wholesale.
    ///
    /// Returns `None` if the template does not exist.
    pub async fn update_with_tasks(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTemplate,
        tasks: &[TaskDefinition],
    ) -> Result<Option<(WorkflowTemplate, Vec<TemplateTask>)>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE workflow_templates SET
                name = $2,
                description = $3,
                workflow_type = $4,
                is_active = $5,
                updated_by = $6,
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let Some(template) = sqlx::query_as::<_, WorkflowTemplate>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.workflow_type)
            .bind(input.is_active)
            .bind(input.updated_by)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };

        TemplateTaskRepo::delete_by_template(&mut tx, id).await?;
        let rows = TemplateTaskRepo::insert_all(&mut tx, id, tasks).await?;

        tx.commit().await?;
        Ok(Some((template, rows)))
    }

    /// Find a template by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<WorkflowTemplate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workflow_templates WHERE id = $1");
        sqlx::query_as::<_, WorkflowTemplate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List template summaries with task counts, newest first. When
    /// `active_only` is set, inactive templates are filtered out.
    pub async fn list_summaries(
        pool: &PgPool,
        active_only: bool,
    ) -> Result<Vec<TemplateSummary>, sqlx::Error> {
        sqlx::query_as::<_, TemplateSummary>(
            "SELECT t.id, t.name, t.workflow_type, t.is_active,
                    COUNT(tt.id) AS task_count, t.created_at, t.updated_at
             FROM workflow_templates t
             LEFT JOIN template_tasks tt ON tt.template_id = t.id
             WHERE ($1 = false OR t.is_active = true)
             GROUP BY t.id
             ORDER BY t.created_at DESC",
        )
        .bind(active_only)
        .fetch_all(pool)
        .await
    }

    /// Soft delete: mark the template inactive. Returns `true` if a row
    /// was updated.
    pub async fn soft_delete(pool: &PgPool, id: DbId, updated_by: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE workflow_templates
             SET is_active = false, updated_by = $2, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(updated_by)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
