//! Repository for the `template_tasks` table.

use std::collections::HashMap;

use elms_core::template_rules::TaskDefinition;
use elms_core::types::DbId;
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::template::TemplateTask;

const COLUMNS: &str = "id, template_id, task_name, description, assigned_role, \
                        sequence_order, is_parallel, dependency_task_id, position, \
                        created_at, updated_at";

/// Provides queries for template tasks. Writes happen inside the template
/// repository's transactions.
pub struct TemplateTaskRepo;

impl TemplateTaskRepo {
    /// Insert the full task list for a template in list order.
    ///
    /// Incoming `dependency_task_id` values reference the persisted ids the
    /// tasks carried before this replacement. Rows are inserted without
    /// dependencies first, then a second pass remaps each reference onto
    /// the freshly inserted row of the task that previously held that id.
    pub async fn insert_all(
        tx: &mut Transaction<'_, Postgres>,
        template_id: DbId,
        tasks: &[TaskDefinition],
    ) -> Result<Vec<TemplateTask>, sqlx::Error> {
        let insert = format!(
            "INSERT INTO template_tasks
                (template_id, task_name, description, assigned_role,
                 sequence_order, is_parallel, position)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );

        let mut rows: Vec<TemplateTask> = Vec::with_capacity(tasks.len());
        // Maps the persisted id a task carried in the request onto its new row id.
        let mut id_map: HashMap<DbId, DbId> = HashMap::new();

        for (position, task) in tasks.iter().enumerate() {
            let row = sqlx::query_as::<_, TemplateTask>(&insert)
                .bind(template_id)
                .bind(&task.task_name)
                .bind(&task.description)
                .bind(task.assigned_role)
                .bind(task.sequence_order)
                .bind(task.is_parallel)
                .bind(position as i32)
                .fetch_one(&mut **tx)
                .await?;
            if let Some(old_id) = task.id {
                id_map.insert(old_id, row.id);
            }
            rows.push(row);
        }

        for (row, task) in rows.iter_mut().zip(tasks) {
            let Some(new_dep) = task.dependency_task_id.and_then(|old| id_map.get(&old)) else {
                continue;
            };
            sqlx::query("UPDATE template_tasks SET dependency_task_id = $2 WHERE id = $1")
                .bind(row.id)
                .bind(new_dep)
                .execute(&mut **tx)
                .await?;
            row.dependency_task_id = Some(*new_dep);
        }

        Ok(rows)
    }

    /// Delete every task belonging to a template (wholesale replacement).
    pub async fn delete_by_template(
        tx: &mut Transaction<'_, Postgres>,
        template_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM template_tasks WHERE template_id = $1")
            .bind(template_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// List a template's tasks in list order (position, then id).
    pub async fn list_by_template(
        pool: &PgPool,
        template_id: DbId,
    ) -> Result<Vec<TemplateTask>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM template_tasks
             WHERE template_id = $1
             ORDER BY position, id"
        );
        sqlx::query_as::<_, TemplateTask>(&query)
            .bind(template_id)
            .fetch_all(pool)
            .await
    }
}
