//! Handlers for the `/templates` resource.
//!
//! Template authoring is gated to HR Admin and Administrator roles. A
//! create or update submission passes field-local validation first (400
//! with a field-error map), then the task-graph rules (sequence grouping,
//! backward-only dependencies, cycle detection), and is written together
//! with its tasks in one transaction.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use elms_core::custom_fields::CustomField;
use elms_core::error::CoreError;
use elms_core::template_rules::{
    normalize_sequence_orders, validate_submission, validate_task_graph, TemplateSubmission,
};
use elms_core::types::{DbId, Timestamp};
use elms_core::workflow::WorkflowType;
use serde::{Deserialize, Serialize};

use elms_db::models::template::{CreateTemplate, TemplateSummary, TemplateTask, UpdateTemplate};
use elms_db::repositories::{CustomFieldRepo, TemplateRepo, TemplateTaskRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireTemplateEditor;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /templates`.
#[derive(Debug, Deserialize)]
pub struct ListTemplatesQuery {
    /// When true, only active templates are returned.
    #[serde(default)]
    pub active: bool,
}

/// Full template detail returned by create, update, and get-by-id.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDetailResponse {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub workflow_type: WorkflowType,
    pub is_active: bool,
    pub tasks: Vec<TemplateTask>,
    /// Custom-field schema consumed by the workflow initiation form.
    pub custom_fields: Vec<CustomField>,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_by: DbId,
    pub updated_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/templates
///
/// Create a template with its task list. New tasks carry no persisted ids,
/// so the graph rules reject any non-null dependency id here; dependencies
/// for new templates are derived from sequence order downstream.
pub async fn create_template(
    State(state): State<AppState>,
    RequireTemplateEditor(editor): RequireTemplateEditor,
    Json(input): Json<TemplateSubmission>,
) -> AppResult<(StatusCode, Json<TemplateDetailResponse>)> {
    validate_submission(&input).map_err(AppError::FieldValidation)?;

    let mut tasks = input.tasks.clone();
    normalize_sequence_orders(&mut tasks);
    validate_task_graph(&tasks)?;

    let create_dto = CreateTemplate {
        name: input.name,
        description: input.description,
        workflow_type: input.workflow_type,
        created_by: editor.user_id,
    };

    let (template, task_rows) =
        TemplateRepo::create_with_tasks(&state.pool, &create_dto, &tasks).await?;
    tracing::info!(template_id = template.id, tasks = task_rows.len(), "Template created");

    let response = build_detail(&state, template, task_rows).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/templates
///
/// List template summaries; `?active=true` filters out inactive ones.
pub async fn list_templates(
    State(state): State<AppState>,
    RequireTemplateEditor(_editor): RequireTemplateEditor,
    Query(query): Query<ListTemplatesQuery>,
) -> AppResult<Json<Vec<TemplateSummary>>> {
    let summaries = TemplateRepo::list_summaries(&state.pool, query.active).await?;
    Ok(Json(summaries))
}

/// GET /api/v1/templates/{id}
///
/// Full template detail including tasks and custom-field schema.
pub async fn get_template(
    State(state): State<AppState>,
    RequireTemplateEditor(_editor): RequireTemplateEditor,
    Path(id): Path<DbId>,
) -> AppResult<Json<TemplateDetailResponse>> {
    let template = TemplateRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Template",
            id,
        }))?;
    let tasks = TemplateTaskRepo::list_by_template(&state.pool, id).await?;
    let response = build_detail(&state, template, tasks).await?;
    Ok(Json(response))
}

/// PUT /api/v1/templates/{id}
///
/// Replace the template's fields and its whole task list. Kept tasks carry
/// their persisted ids; dependency ids must reference the persisted id of
/// an earlier task in the submitted list and are remapped onto the freshly
/// inserted rows.
pub async fn update_template(
    State(state): State<AppState>,
    RequireTemplateEditor(editor): RequireTemplateEditor,
    Path(id): Path<DbId>,
    Json(input): Json<TemplateSubmission>,
) -> AppResult<Json<TemplateDetailResponse>> {
    let existing = TemplateRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Template",
            id,
        }))?;

    validate_submission(&input).map_err(AppError::FieldValidation)?;

    let mut tasks = input.tasks.clone();
    normalize_sequence_orders(&mut tasks);
    validate_task_graph(&tasks)?;

    let update_dto = UpdateTemplate {
        name: input.name,
        description: input.description,
        workflow_type: input.workflow_type,
        is_active: input.is_active.unwrap_or(existing.is_active),
        updated_by: editor.user_id,
    };

    let (template, task_rows) =
        TemplateRepo::update_with_tasks(&state.pool, id, &update_dto, &tasks)
            .await?
            .ok_or(AppError::Core(CoreError::NotFound {
                entity: "Template",
                id,
            }))?;
    tracing::info!(template_id = template.id, tasks = task_rows.len(), "Template updated");

    let response = build_detail(&state, template, task_rows).await?;
    Ok(Json(response))
}

/// DELETE /api/v1/templates/{id}
///
/// Soft delete: the template is marked inactive and disappears from the
/// active list, but existing workflow instances keep referencing it.
pub async fn delete_template(
    State(state): State<AppState>,
    RequireTemplateEditor(editor): RequireTemplateEditor,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deleted = TemplateRepo::soft_delete(&state.pool, id, editor.user_id).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "Template",
            id,
        }))
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

async fn build_detail(
    state: &AppState,
    template: elms_db::models::template::WorkflowTemplate,
    tasks: Vec<TemplateTask>,
) -> AppResult<TemplateDetailResponse> {
    let custom_fields = CustomFieldRepo::list_by_template(&state.pool, template.id)
        .await?
        .into_iter()
        .map(|row| row.into_schema_field())
        .collect();

    Ok(TemplateDetailResponse {
        id: template.id,
        name: template.name,
        description: template.description,
        workflow_type: template.workflow_type,
        is_active: template.is_active,
        tasks,
        custom_fields,
        created_by: template.created_by,
        created_at: template.created_at,
        updated_by: template.updated_by,
        updated_at: template.updated_at,
    })
}
