//! Handlers for the `/workflows` resource.
//!
//! Initiation instantiates an active template for one employee: the
//! custom-field values are filtered through the form-engine visibility
//! contract (the server is the authoritative submission consumer), task
//! instances are fanned out, the initial state history row is written, and
//! the assignment engine routes the first wave of tasks.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use elms_core::custom_fields::{filter_submission_values, missing_required_fields, CustomField};
use elms_core::error::CoreError;
use elms_core::template_rules::FieldErrors;
use elms_core::types::{DbId, Timestamp};
use elms_core::workflow::{
    validate_task_transition, validate_workflow_transition, TaskStatus, WorkflowStatus,
    WorkflowType,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use elms_db::models::workflow::{
    CreateStateHistory, CreateTaskInstance, CreateWorkflowInstance, TaskInstance,
    WorkflowStateHistory,
};
use elms_db::repositories::{
    CustomFieldRepo, StateHistoryRepo, TaskInstanceRepo, TemplateRepo, TemplateTaskRepo,
    WorkflowRepo,
};

use crate::engine::assignment::assign_tasks_for_workflow;
use crate::error::{field_errors_from_validator, AppError, AppResult};
use crate::middleware::rbac::{RequireAuth, RequireHrAdmin};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /workflows`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct InitiateWorkflowRequest {
    pub template_id: DbId,
    #[validate(length(min = 1, message = "Employee name is required"))]
    pub employee_name: String,
    #[validate(email(message = "Employee email must be valid"))]
    pub employee_email: String,
    #[validate(length(min = 1, message = "Employee role is required"))]
    pub employee_role: String,
    #[serde(default)]
    pub custom_field_values: IndexMap<String, Value>,
}

/// Response body for `POST /workflows`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInitiationResponse {
    pub workflow_instance_id: DbId,
    pub message: String,
}

/// Query parameters for `GET /workflows`.
#[derive(Debug, Deserialize)]
pub struct ListWorkflowsQuery {
    pub status: Option<WorkflowStatus>,
}

/// Summary row returned by `GET /workflows`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummaryResponse {
    pub id: DbId,
    pub template_id: DbId,
    pub employee_name: String,
    pub employee_role: String,
    pub workflow_type: WorkflowType,
    pub status: WorkflowStatus,
    pub initiated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// Full workflow detail returned by `GET /workflows/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDetailResponse {
    pub id: DbId,
    pub template_id: DbId,
    pub employee_name: String,
    pub employee_email: String,
    pub employee_role: String,
    pub workflow_type: WorkflowType,
    pub status: WorkflowStatus,
    pub custom_field_values: Value,
    pub initiated_by: DbId,
    pub initiated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub tasks: Vec<TaskInstance>,
    pub state_history: Vec<WorkflowStateHistory>,
}

/// Request body for `PUT /workflows/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateWorkflowStatusRequest {
    pub status: WorkflowStatus,
    pub notes: Option<String>,
}

/// Task-count summary returned after a workflow status change.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStateSummary {
    pub workflow_instance_id: DbId,
    pub status: WorkflowStatus,
    pub tasks_not_started: i64,
    pub tasks_in_progress: i64,
    pub tasks_blocked: i64,
    pub tasks_completed: i64,
    pub total_tasks: i64,
}

/// Request body for `PUT /workflows/tasks/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateTaskStatusRequest {
    pub status: TaskStatus,
}

/// Response body for a task status change.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateResponse {
    pub task_instance_id: DbId,
    pub task_name: String,
    pub status: TaskStatus,
    pub completed_at: Option<Timestamp>,
    pub completed_by: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/workflows
///
/// Initiate a workflow from an active template. Only HR admins may
/// initiate. Returns 201 with the new instance id.
pub async fn initiate_workflow(
    State(state): State<AppState>,
    RequireHrAdmin(initiator): RequireHrAdmin,
    Json(input): Json<InitiateWorkflowRequest>,
) -> AppResult<(StatusCode, Json<WorkflowInitiationResponse>)> {
    input
        .validate()
        .map_err(|e| AppError::FieldValidation(field_errors_from_validator(&e)))?;

    tracing::info!(
        template_id = input.template_id,
        employee = %input.employee_name,
        "Initiating workflow"
    );

    // Template must exist and be active.
    let template = TemplateRepo::find_by_id(&state.pool, input.template_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Template",
            id: input.template_id,
        }))?;
    if !template.is_active {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Cannot instantiate inactive workflow template: {}",
            template.id
        ))));
    }

    // Apply the custom-field submission contract: recompute visibility from
    // the submitted values and drop hidden, unfilled, or unknown keys.
    let schema: Vec<CustomField> = CustomFieldRepo::list_by_template(&state.pool, template.id)
        .await?
        .into_iter()
        .map(|row| row.into_schema_field())
        .collect();
    let accepted_values = filter_submission_values(&schema, &input.custom_field_values);

    // Required visible fields must be filled.
    let missing = missing_required_fields(&schema, &accepted_values);
    if !missing.is_empty() {
        let mut errors = FieldErrors::new();
        for field in missing {
            errors.insert(
                format!("customFieldValues.{}", field.name),
                format!("{} is required", field.label),
            );
        }
        return Err(AppError::FieldValidation(errors));
    }

    // Create the instance in INITIATED status.
    let instance = WorkflowRepo::create(
        &state.pool,
        &CreateWorkflowInstance {
            template_id: template.id,
            employee_name: input.employee_name,
            employee_email: input.employee_email,
            employee_role: input.employee_role,
            workflow_type: template.workflow_type,
            custom_field_values: serde_json::to_value(&accepted_values)
                .map_err(|e| AppError::InternalError(format!("Value serialization error: {e}")))?,
            initiated_by: initiator.user_id,
        },
    )
    .await?;

    // Fan out one task instance per template task, all visible.
    let template_tasks = TemplateTaskRepo::list_by_template(&state.pool, template.id).await?;
    let task_inputs: Vec<CreateTaskInstance> = template_tasks
        .iter()
        .map(|t| CreateTaskInstance {
            workflow_instance_id: instance.id,
            template_task_id: t.id,
            task_name: t.task_name.clone(),
            sequence_order: t.sequence_order,
            assigned_role: t.assigned_role,
            is_visible: true,
        })
        .collect();
    let tasks = TaskInstanceRepo::insert_all(&state.pool, &task_inputs).await?;

    // Initial state history record.
    StateHistoryRepo::create(
        &state.pool,
        &CreateStateHistory {
            workflow_instance_id: instance.id,
            previous_status: WorkflowStatus::Initiated,
            new_status: WorkflowStatus::Initiated,
            changed_by: initiator.user_id,
            notes: Some("Workflow initiated".into()),
        },
    )
    .await?;

    // Route the first wave of tasks.
    let assignments = assign_tasks_for_workflow(&state.pool, instance.id).await?;

    tracing::info!(
        workflow_instance_id = instance.id,
        total_tasks = tasks.len(),
        assigned = assignments.len(),
        "Workflow created"
    );

    let response = WorkflowInitiationResponse {
        workflow_instance_id: instance.id,
        message: format!(
            "Workflow initiated with {} tasks, {} assigned",
            tasks.len(),
            assignments.len()
        ),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/workflows
///
/// List workflow summaries, newest first; `?status=` filters by status.
pub async fn list_workflows(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Query(query): Query<ListWorkflowsQuery>,
) -> AppResult<Json<Vec<WorkflowSummaryResponse>>> {
    let instances = WorkflowRepo::list(&state.pool, query.status).await?;
    let summaries = instances
        .into_iter()
        .map(|w| WorkflowSummaryResponse {
            id: w.id,
            template_id: w.template_id,
            employee_name: w.employee_name,
            employee_role: w.employee_role,
            workflow_type: w.workflow_type,
            status: w.status,
            initiated_at: w.initiated_at,
            completed_at: w.completed_at,
        })
        .collect();
    Ok(Json(summaries))
}

/// GET /api/v1/workflows/{id}
///
/// Full workflow detail including task instances and state history.
pub async fn get_workflow(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    Path(id): Path<DbId>,
) -> AppResult<Json<WorkflowDetailResponse>> {
    let workflow = WorkflowRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Workflow",
            id,
        }))?;

    let tasks = TaskInstanceRepo::list_by_workflow(&state.pool, id).await?;
    let state_history = StateHistoryRepo::list_by_workflow(&state.pool, id).await?;

    Ok(Json(WorkflowDetailResponse {
        id: workflow.id,
        template_id: workflow.template_id,
        employee_name: workflow.employee_name,
        employee_email: workflow.employee_email,
        employee_role: workflow.employee_role,
        workflow_type: workflow.workflow_type,
        status: workflow.status,
        custom_field_values: workflow.custom_field_values,
        initiated_by: workflow.initiated_by,
        initiated_at: workflow.initiated_at,
        completed_at: workflow.completed_at,
        tasks,
        state_history,
    }))
}

/// PUT /api/v1/workflows/{id}/status
///
/// Apply a validated status transition and record it in the history.
pub async fn update_workflow_status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateWorkflowStatusRequest>,
) -> AppResult<Json<WorkflowStateSummary>> {
    let workflow = WorkflowRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Workflow",
            id,
        }))?;

    validate_workflow_transition(workflow.status, input.status)?;

    let completed_at = (input.status == WorkflowStatus::Completed).then(Utc::now);
    WorkflowRepo::update_status(&state.pool, id, input.status, completed_at).await?;

    StateHistoryRepo::create(
        &state.pool,
        &CreateStateHistory {
            workflow_instance_id: id,
            previous_status: workflow.status,
            new_status: input.status,
            changed_by: user.user_id,
            notes: input.notes.or_else(|| Some("Status updated".into())),
        },
    )
    .await?;

    tracing::info!(
        workflow_instance_id = id,
        from = ?workflow.status,
        to = ?input.status,
        "Workflow status updated"
    );

    let summary = build_state_summary(&state, id, input.status).await?;
    Ok(Json(summary))
}

/// PUT /api/v1/workflows/tasks/{id}/status
///
/// Apply a validated task transition. Completion stamps completed_at/by,
/// triggers assignment of newly-ready dependents, and completes the
/// workflow when every visible task is done.
pub async fn update_task_status(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTaskStatusRequest>,
) -> AppResult<Json<TaskStatusUpdateResponse>> {
    let task = TaskInstanceRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "TaskInstance",
            id,
        }))?;

    validate_task_transition(task.status, input.status)?;

    let completed_by = (input.status == TaskStatus::Completed).then_some(user.user_id);
    let updated = TaskInstanceRepo::update_status(&state.pool, id, input.status, completed_by)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "TaskInstance",
            id,
        }))?;

    tracing::info!(
        task_instance_id = id,
        from = ?task.status,
        to = ?input.status,
        "Task status updated"
    );

    if input.status == TaskStatus::Completed {
        // Newly satisfied dependencies may unlock further tasks.
        assign_tasks_for_workflow(&state.pool, task.workflow_instance_id).await?;
        complete_workflow_if_done(&state, task.workflow_instance_id, user.user_id).await?;
    }

    Ok(Json(TaskStatusUpdateResponse {
        task_instance_id: updated.id,
        task_name: updated.task_name,
        status: updated.status,
        completed_at: updated.completed_at,
        completed_by: updated.completed_by,
    }))
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Move the workflow to COMPLETED when every visible task is completed.
/// Idempotent: does nothing unless the workflow is IN_PROGRESS.
async fn complete_workflow_if_done(
    state: &AppState,
    workflow_instance_id: DbId,
    user_id: DbId,
) -> AppResult<()> {
    let tasks = TaskInstanceRepo::list_by_workflow(&state.pool, workflow_instance_id).await?;
    let visible: Vec<_> = tasks.iter().filter(|t| t.is_visible).collect();
    let all_done =
        !visible.is_empty() && visible.iter().all(|t| t.status == TaskStatus::Completed);
    if !all_done {
        return Ok(());
    }

    let workflow = WorkflowRepo::find_by_id(&state.pool, workflow_instance_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Workflow",
            id: workflow_instance_id,
        }))?;
    if workflow.status != WorkflowStatus::InProgress {
        return Ok(());
    }

    WorkflowRepo::update_status(
        &state.pool,
        workflow_instance_id,
        WorkflowStatus::Completed,
        Some(Utc::now()),
    )
    .await?;
    StateHistoryRepo::create(
        &state.pool,
        &CreateStateHistory {
            workflow_instance_id,
            previous_status: WorkflowStatus::InProgress,
            new_status: WorkflowStatus::Completed,
            changed_by: user_id,
            notes: Some("All visible tasks completed".into()),
        },
    )
    .await?;

    tracing::info!(workflow_instance_id, "Workflow completed");
    Ok(())
}

/// Aggregate task counts by status for the state summary response.
async fn build_state_summary(
    state: &AppState,
    workflow_instance_id: DbId,
    status: WorkflowStatus,
) -> AppResult<WorkflowStateSummary> {
    let not_started = TaskInstanceRepo::count_by_workflow_and_status(
        &state.pool,
        workflow_instance_id,
        TaskStatus::NotStarted,
    )
    .await?;
    let in_progress = TaskInstanceRepo::count_by_workflow_and_status(
        &state.pool,
        workflow_instance_id,
        TaskStatus::InProgress,
    )
    .await?;
    let blocked = TaskInstanceRepo::count_by_workflow_and_status(
        &state.pool,
        workflow_instance_id,
        TaskStatus::Blocked,
    )
    .await?;
    let completed = TaskInstanceRepo::count_by_workflow_and_status(
        &state.pool,
        workflow_instance_id,
        TaskStatus::Completed,
    )
    .await?;

    Ok(WorkflowStateSummary {
        workflow_instance_id,
        status,
        tasks_not_started: not_started,
        tasks_in_progress: in_progress,
        tasks_blocked: blocked,
        tasks_completed: completed,
        total_tasks: not_started + in_progress + blocked + completed,
    })
}
