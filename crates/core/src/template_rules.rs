//! Template submission types and task-graph validation rules.
//!
//! A [`TemplateSubmission`] is the wire shape accepted by the template
//! create/update endpoints and produced by the draft editor. The rules in
//! this module are the server-side authority on task-graph consistency:
//! sequence-order normalization, parallel grouping, dependency validity,
//! and cycle detection.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::roles::UserRole;
use crate::types::DbId;
use crate::workflow::WorkflowType;

/// Maximum length for template and task names.
pub const MAX_NAME_LEN: usize = 255;

/// One task definition within a template submission.
///
/// `id` is the persisted task id, present only when updating an existing
/// template; brand-new tasks have no id yet. `dependency_task_id` must
/// reference the `id` of a task positioned earlier in the list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDefinition {
    #[serde(default)]
    pub id: Option<DbId>,
    pub task_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub assigned_role: UserRole,
    pub sequence_order: i32,
    #[serde(default)]
    pub is_parallel: bool,
    #[serde(default)]
    pub dependency_task_id: Option<DbId>,
}

/// Full template create/update payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSubmission {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub workflow_type: WorkflowType,
    pub tasks: Vec<TaskDefinition>,
    /// Only meaningful on update; creation always starts active.
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Field-local validation errors keyed by wire field path
/// (e.g. `name`, `tasks[2].taskName`), in field order.
pub type FieldErrors = IndexMap<String, String>;

/// Field-local validation: template name, task names, non-empty task list.
///
/// Mirrors the checks the form performs before any request is issued, so a
/// submission that fails here never reaches the task-graph rules.
pub fn validate_submission(submission: &TemplateSubmission) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if submission.name.trim().is_empty() {
        errors.insert("name".into(), "Template name is required".into());
    } else if submission.name.len() > MAX_NAME_LEN {
        errors.insert(
            "name".into(),
            "Template name must not exceed 255 characters".into(),
        );
    }

    if submission.tasks.is_empty() {
        errors.insert("tasks".into(), "Template must have at least one task".into());
    }

    for (i, task) in submission.tasks.iter().enumerate() {
        if task.task_name.trim().is_empty() {
            errors.insert(
                format!("tasks[{i}].taskName"),
                "Task name is required".into(),
            );
        } else if task.task_name.len() > MAX_NAME_LEN {
            errors.insert(
                format!("tasks[{i}].taskName"),
                "Task name must not exceed 255 characters".into(),
            );
        }
        if task.sequence_order < 1 {
            errors.insert(
                format!("tasks[{i}].sequenceOrder"),
                "Sequence order must be greater than 0".into(),
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Structural validation of the task graph.
///
/// Checks, in order: at least one task, sequence-order grouping (multiple
/// tasks sharing an order must all be parallel), dependency ids referencing
/// known tasks positioned strictly earlier in the list, and absence of
/// dependency cycles.
pub fn validate_task_graph(tasks: &[TaskDefinition]) -> Result<(), CoreError> {
    if tasks.is_empty() {
        return Err(CoreError::Validation(
            "Template must have at least one task".into(),
        ));
    }
    validate_sequence_groups(tasks)?;
    validate_dependencies(tasks)?;
    detect_dependency_cycles(tasks)
}

/// Multiple tasks at the same sequence order must all be marked parallel.
/// A lone parallel task is fine; more tasks may join its order later.
fn validate_sequence_groups(tasks: &[TaskDefinition]) -> Result<(), CoreError> {
    let mut by_order: HashMap<i32, Vec<&TaskDefinition>> = HashMap::new();
    for task in tasks {
        by_order.entry(task.sequence_order).or_default().push(task);
    }

    for (order, group) in &by_order {
        if group.len() > 1 && !group.iter().all(|t| t.is_parallel) {
            return Err(CoreError::Validation(format!(
                "Tasks with sequence order {order} must be marked as parallel or have unique sequence orders"
            )));
        }
    }
    Ok(())
}

/// Every dependency id must match the persisted id of a task appearing
/// earlier in the list. For a brand-new template no task has an id yet,
/// so any non-null dependency is rejected here.
fn validate_dependencies(tasks: &[TaskDefinition]) -> Result<(), CoreError> {
    let mut seen: HashSet<DbId> = HashSet::new();

    for task in tasks {
        if let Some(dep_id) = task.dependency_task_id {
            if !seen.contains(&dep_id) {
                return Err(CoreError::Validation(format!(
                    "Task '{}' references non-existent dependency task",
                    task.task_name
                )));
            }
        }
        if let Some(id) = task.id {
            seen.insert(id);
        }
    }
    Ok(())
}

/// Depth-first search over persisted-id dependency edges.
///
/// Backward-only references cannot form a cycle, but the graph arrives from
/// the wire and this check is the last line of defence.
fn detect_dependency_cycles(tasks: &[TaskDefinition]) -> Result<(), CoreError> {
    let by_id: HashMap<DbId, &TaskDefinition> = tasks
        .iter()
        .filter_map(|t| t.id.map(|id| (id, t)))
        .collect();

    let mut visited: HashSet<DbId> = HashSet::new();

    for task in tasks {
        let Some(start) = task.id else { continue };
        if visited.contains(&start) {
            continue;
        }

        let mut stack: HashSet<DbId> = HashSet::new();
        let mut current = Some(task);
        while let Some(t) = current {
            let Some(id) = t.id else { break };
            if stack.contains(&id) {
                return Err(CoreError::Validation(format!(
                    "Circular dependency detected: Task '{}' has a circular dependency chain",
                    t.task_name
                )));
            }
            if visited.contains(&id) {
                break;
            }
            visited.insert(id);
            stack.insert(id);
            current = t
                .dependency_task_id
                .and_then(|dep| by_id.get(&dep).copied());
        }
    }
    Ok(())
}

/// Normalize sequence orders by removing gaps while preserving parallel
/// grouping: `[1, 3, 5]` becomes `[1, 2, 3]` and `[1, 1, 3]` becomes
/// `[1, 1, 2]`. Tasks are sorted by their current order first; ties keep
/// their relative position.
pub fn normalize_sequence_orders(tasks: &mut [TaskDefinition]) {
    if tasks.is_empty() {
        return;
    }

    tasks.sort_by_key(|t| t.sequence_order);

    let mut current = 0;
    let mut previous: Option<i32> = None;
    for task in tasks.iter_mut() {
        if previous != Some(task.sequence_order) {
            previous = Some(task.sequence_order);
            current += 1;
        }
        task.sequence_order = current;
    }
}
