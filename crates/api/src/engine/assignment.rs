//! Automatic task routing for workflow instances.
//!
//! Assigns ready tasks to users with the matching role, balancing load by
//! picking the assignee with the fewest IN_PROGRESS tasks. A task is ready
//! when it is NOT_STARTED, visible, unassigned, and its dependency (if any)
//! is COMPLETED. The whole pass is idempotent: already-assigned tasks are
//! skipped, so it can run after initiation and again after every task
//! completion.

use std::collections::HashMap;

use chrono::Utc;
use elms_core::error::CoreError;
use elms_core::types::{DbId, Timestamp};
use elms_core::workflow::{TaskStatus, WorkflowStatus};
use serde::Serialize;

use elms_db::models::template::TemplateTask;
use elms_db::models::user::User;
use elms_db::models::workflow::{CreateStateHistory, TaskInstance, WorkflowInstance};
use elms_db::repositories::{
    StateHistoryRepo, TaskInstanceRepo, TemplateTaskRepo, UserRepo, WorkflowRepo,
};
use elms_db::DbPool;

use crate::error::{AppError, AppResult};

/// Due-date SLA applied to newly assigned tasks.
const ASSIGNMENT_SLA_DAYS: i64 = 2;

/// One successful assignment made by [`assign_tasks_for_workflow`].
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssignment {
    pub task_instance_id: DbId,
    pub task_name: String,
    pub assigned_user_id: DbId,
    pub assigned_user_email: String,
    pub due_date: Timestamp,
}

/// Assign every ready task of the workflow to the least-loaded eligible
/// user. Moves the workflow INITIATED -> IN_PROGRESS (with a history row)
/// when this pass makes the first assignment.
pub async fn assign_tasks_for_workflow(
    pool: &DbPool,
    workflow_instance_id: DbId,
) -> AppResult<Vec<TaskAssignment>> {
    tracing::info!(workflow_instance_id, "Assigning tasks");

    let workflow = WorkflowRepo::find_by_id(pool, workflow_instance_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Workflow",
            id: workflow_instance_id,
        }))?;

    let all_tasks = TaskInstanceRepo::list_by_workflow(pool, workflow_instance_id).await?;
    let template_tasks: HashMap<DbId, TemplateTask> =
        TemplateTaskRepo::list_by_template(pool, workflow.template_id)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();

    let is_first_assignment = all_tasks.iter().all(|t| t.assigned_user_id.is_none());

    let mut assignments = Vec::new();
    for task in &all_tasks {
        if !is_ready(task, &all_tasks, &template_tasks) {
            continue;
        }
        if let Some(assignment) = assign_task(pool, task).await? {
            assignments.push(assignment);
        }
    }

    if is_first_assignment && !assignments.is_empty() {
        mark_in_progress(pool, &workflow).await?;
    }

    tracing::info!(
        workflow_instance_id,
        assigned = assignments.len(),
        "Task assignment pass complete"
    );
    Ok(assignments)
}

/// Ready = unassigned, NOT_STARTED, visible, and dependency satisfied.
fn is_ready(
    task: &TaskInstance,
    all_tasks: &[TaskInstance],
    template_tasks: &HashMap<DbId, TemplateTask>,
) -> bool {
    if task.assigned_user_id.is_some()
        || task.status != TaskStatus::NotStarted
        || !task.is_visible
    {
        return false;
    }

    let Some(template_task) = template_tasks.get(&task.template_task_id) else {
        tracing::warn!(task_instance_id = task.id, "Template task missing for instance");
        return false;
    };

    let Some(dependency_id) = template_task.dependency_task_id else {
        return true;
    };

    // The dependency is satisfied when its task instance is completed.
    match all_tasks
        .iter()
        .find(|t| t.template_task_id == dependency_id)
    {
        Some(dependency) => dependency.status == TaskStatus::Completed,
        None => {
            tracing::warn!(
                task_instance_id = task.id,
                dependency_id,
                "Dependency task instance not found"
            );
            false
        }
    }
}

/// Pick the least-loaded active user with the task's role and assign it.
/// Returns `None` when no eligible user exists (the task stays unassigned).
async fn assign_task(pool: &DbPool, task: &TaskInstance) -> AppResult<Option<TaskAssignment>> {
    let eligible = UserRepo::list_active_by_role(pool, task.assigned_role).await?;
    if eligible.is_empty() {
        tracing::warn!(role = task.assigned_role.as_str(), "No active users for role");
        return Ok(None);
    }

    let user = select_least_loaded(pool, &eligible).await?;
    let due_date = Utc::now() + chrono::Duration::days(ASSIGNMENT_SLA_DAYS);

    let assigned = TaskInstanceRepo::assign(pool, task.id, user.id, due_date)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "TaskInstance",
            id: task.id,
        }))?;

    tracing::debug!(
        task_instance_id = assigned.id,
        user_id = user.id,
        "Task assigned"
    );

    Ok(Some(TaskAssignment {
        task_instance_id: assigned.id,
        task_name: assigned.task_name,
        assigned_user_id: user.id,
        assigned_user_email: user.email.clone(),
        due_date,
    }))
}

/// Load balancing: the user with the fewest IN_PROGRESS tasks wins.
async fn select_least_loaded<'a>(pool: &DbPool, users: &'a [User]) -> AppResult<&'a User> {
    let mut selected = &users[0];
    let mut min_load =
        TaskInstanceRepo::count_by_user_and_status(pool, selected.id, TaskStatus::InProgress)
            .await?;

    for user in &users[1..] {
        let load =
            TaskInstanceRepo::count_by_user_and_status(pool, user.id, TaskStatus::InProgress)
                .await?;
        if load < min_load {
            min_load = load;
            selected = user;
        }
    }
    Ok(selected)
}

/// First assignment moves the workflow out of INITIATED.
async fn mark_in_progress(pool: &DbPool, workflow: &WorkflowInstance) -> AppResult<()> {
    if workflow.status != WorkflowStatus::Initiated {
        return Ok(());
    }

    WorkflowRepo::update_status(pool, workflow.id, WorkflowStatus::InProgress, None).await?;
    StateHistoryRepo::create(
        pool,
        &CreateStateHistory {
            workflow_instance_id: workflow.id,
            previous_status: WorkflowStatus::Initiated,
            new_status: WorkflowStatus::InProgress,
            changed_by: workflow.initiated_by,
            notes: Some("Workflow status updated to IN_PROGRESS after first task assignment".into()),
        },
    )
    .await?;

    tracing::info!(workflow_instance_id = workflow.id, "Workflow moved to IN_PROGRESS");
    Ok(())
}
