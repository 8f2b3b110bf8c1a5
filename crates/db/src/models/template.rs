//! Workflow template and template task models.

use elms_core::roles::UserRole;
use elms_core::types::{DbId, Timestamp};
use elms_core::workflow::WorkflowType;
use serde::Serialize;
use sqlx::FromRow;

/// Row from the `workflow_templates` table.
#[derive(Debug, Clone, FromRow)]
pub struct WorkflowTemplate {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub workflow_type: WorkflowType,
    pub is_active: bool,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_by: DbId,
    pub updated_at: Timestamp,
}

/// Row from the `template_tasks` table.
///
/// `position` is the 0-based slot within the template's task list;
/// `sequence_order` is the derived execution order (parallel tasks share
/// one). Both are persisted because the list order is what editing round
/// trips must preserve.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateTask {
    pub id: DbId,
    #[serde(skip_serializing)]
    pub template_id: DbId,
    pub task_name: String,
    pub description: Option<String>,
    pub assigned_role: UserRole,
    pub sequence_order: i32,
    pub is_parallel: bool,
    pub dependency_task_id: Option<DbId>,
    #[serde(skip_serializing)]
    pub position: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Template summary with task count, as returned by the list endpoint.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: DbId,
    pub name: String,
    pub workflow_type: WorkflowType,
    pub is_active: bool,
    pub task_count: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a template row.
#[derive(Debug)]
pub struct CreateTemplate {
    pub name: String,
    pub description: Option<String>,
    pub workflow_type: WorkflowType,
    pub created_by: DbId,
}

/// DTO for updating a template row's own fields.
#[derive(Debug)]
pub struct UpdateTemplate {
    pub name: String,
    pub description: Option<String>,
    pub workflow_type: WorkflowType,
    pub is_active: bool,
    pub updated_by: DbId,
}
