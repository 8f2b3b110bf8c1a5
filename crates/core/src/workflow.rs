//! Workflow and task lifecycle enums with transition rules.
//!
//! Both state machines share the same shape: an initial state, a working
//! state, a blocked state that can resume, and a terminal completed state.
//! Transition validation lives here so the API and repository layers agree
//! on what moves are legal.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Category of an employee lifecycle workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "TEXT", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowType {
    Onboarding,
    Offboarding,
}

/// Status of a workflow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "TEXT", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Initiated,
    InProgress,
    Blocked,
    Completed,
}

/// Status of a single task instance within a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "TEXT", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Blocked,
    Completed,
}

/// Whether a workflow may move from `current` to `next`.
///
/// COMPLETED is terminal and nothing may return to INITIATED.
pub fn is_valid_workflow_transition(current: WorkflowStatus, next: WorkflowStatus) -> bool {
    if current == WorkflowStatus::Completed || next == WorkflowStatus::Initiated {
        return false;
    }
    match current {
        WorkflowStatus::Initiated => next == WorkflowStatus::InProgress,
        WorkflowStatus::InProgress => {
            next == WorkflowStatus::Completed || next == WorkflowStatus::Blocked
        }
        WorkflowStatus::Blocked => next == WorkflowStatus::InProgress,
        WorkflowStatus::Completed => false,
    }
}

/// Validate a workflow transition, returning a descriptive error when illegal.
pub fn validate_workflow_transition(
    current: WorkflowStatus,
    next: WorkflowStatus,
) -> Result<(), CoreError> {
    if is_valid_workflow_transition(current, next) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid workflow state transition from {current:?} to {next:?}"
        )))
    }
}

/// Whether a task may move from `current` to `next`. COMPLETED is terminal.
pub fn is_valid_task_transition(current: TaskStatus, next: TaskStatus) -> bool {
    match current {
        TaskStatus::NotStarted => next == TaskStatus::InProgress,
        TaskStatus::InProgress => next == TaskStatus::Completed || next == TaskStatus::Blocked,
        TaskStatus::Blocked => next == TaskStatus::InProgress,
        TaskStatus::Completed => false,
    }
}

/// Validate a task transition, returning a descriptive error when illegal.
pub fn validate_task_transition(current: TaskStatus, next: TaskStatus) -> Result<(), CoreError> {
    if is_valid_task_transition(current, next) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid task state transition from {current:?} to {next:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_happy_path_transitions() {
        assert!(is_valid_workflow_transition(
            WorkflowStatus::Initiated,
            WorkflowStatus::InProgress
        ));
        assert!(is_valid_workflow_transition(
            WorkflowStatus::InProgress,
            WorkflowStatus::Completed
        ));
        assert!(is_valid_workflow_transition(
            WorkflowStatus::InProgress,
            WorkflowStatus::Blocked
        ));
        assert!(is_valid_workflow_transition(
            WorkflowStatus::Blocked,
            WorkflowStatus::InProgress
        ));
    }

    #[test]
    fn workflow_completed_is_terminal() {
        for next in [
            WorkflowStatus::Initiated,
            WorkflowStatus::InProgress,
            WorkflowStatus::Blocked,
            WorkflowStatus::Completed,
        ] {
            assert!(!is_valid_workflow_transition(WorkflowStatus::Completed, next));
        }
    }

    #[test]
    fn workflow_cannot_return_to_initiated() {
        assert!(!is_valid_workflow_transition(
            WorkflowStatus::InProgress,
            WorkflowStatus::Initiated
        ));
        assert!(!is_valid_workflow_transition(
            WorkflowStatus::Blocked,
            WorkflowStatus::Initiated
        ));
    }

    #[test]
    fn workflow_cannot_skip_to_completed() {
        assert!(!is_valid_workflow_transition(
            WorkflowStatus::Initiated,
            WorkflowStatus::Completed
        ));
        assert!(!is_valid_workflow_transition(
            WorkflowStatus::Blocked,
            WorkflowStatus::Completed
        ));
    }

    #[test]
    fn task_transitions_mirror_workflow_rules() {
        assert!(is_valid_task_transition(
            TaskStatus::NotStarted,
            TaskStatus::InProgress
        ));
        assert!(is_valid_task_transition(
            TaskStatus::InProgress,
            TaskStatus::Completed
        ));
        assert!(is_valid_task_transition(
            TaskStatus::InProgress,
            TaskStatus::Blocked
        ));
        assert!(is_valid_task_transition(
            TaskStatus::Blocked,
            TaskStatus::InProgress
        ));
        assert!(!is_valid_task_transition(
            TaskStatus::NotStarted,
            TaskStatus::Completed
        ));
        assert!(!is_valid_task_transition(
            TaskStatus::Completed,
            TaskStatus::InProgress
        ));
    }

    #[test]
    fn validate_returns_descriptive_error() {
        let err = validate_workflow_transition(WorkflowStatus::Completed, WorkflowStatus::Blocked)
            .unwrap_err();
        assert!(err.to_string().contains("Invalid workflow state transition"));
    }
}
