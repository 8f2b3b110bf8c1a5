//! Workflow instance, task instance, and state history models.

use elms_core::roles::UserRole;
use elms_core::types::{DbId, Timestamp};
use elms_core::workflow::{TaskStatus, WorkflowStatus, WorkflowType};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;

/// Row from the `workflow_instances` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInstance {
    pub id: DbId,
    pub template_id: DbId,
    pub employee_name: String,
    pub employee_email: String,
    pub employee_role: String,
    pub workflow_type: WorkflowType,
    pub status: WorkflowStatus,
    /// Custom field values keyed by field name, as accepted at initiation.
    pub custom_field_values: Value,
    pub initiated_by: DbId,
    pub initiated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// Row from the `task_instances` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInstance {
    pub id: DbId,
    pub workflow_instance_id: DbId,
    pub template_task_id: DbId,
    pub task_name: String,
    pub sequence_order: i32,
    pub assigned_role: UserRole,
    pub status: TaskStatus,
    pub is_visible: bool,
    pub assigned_user_id: Option<DbId>,
    pub due_date: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub completed_by: Option<DbId>,
}

/// Row from the `workflow_state_history` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStateHistory {
    pub id: DbId,
    pub workflow_instance_id: DbId,
    pub previous_status: WorkflowStatus,
    pub new_status: WorkflowStatus,
    pub changed_by: DbId,
    pub changed_at: Timestamp,
    pub notes: Option<String>,
}

/// DTO for inserting a workflow instance.
#[derive(Debug)]
pub struct CreateWorkflowInstance {
    pub template_id: DbId,
    pub employee_name: String,
    pub employee_email: String,
    pub employee_role: String,
    pub workflow_type: WorkflowType,
    pub custom_field_values: Value,
    pub initiated_by: DbId,
}

/// DTO for inserting one task instance.
#[derive(Debug)]
pub struct CreateTaskInstance {
    pub workflow_instance_id: DbId,
    pub template_task_id: DbId,
    pub task_name: String,
    pub sequence_order: i32,
    pub assigned_role: UserRole,
    pub is_visible: bool,
}

/// DTO for appending a state history row.
#[derive(Debug)]
pub struct CreateStateHistory {
    pub workflow_instance_id: DbId,
    pub previous_status: WorkflowStatus,
    pub new_status: WorkflowStatus,
    pub changed_by: DbId,
    pub notes: Option<String>,
}
