//! In-memory editing session for a workflow template's task graph.
//!
//! A [`TemplateDraft`] owns an ordered list of [`DraftTask`]s. Sequence
//! order is never stored on the tasks; it is derived from list position and
//! the parallel flag at submission time. Dependencies are held by surrogate
//! identity (a session-lifetime [`Uuid`], not a list index) and every
//! structural mutation re-validates them, clearing any reference that no
//! longer points strictly backward.

use uuid::Uuid;

use crate::roles::UserRole;
use crate::template_rules::{FieldErrors, TaskDefinition, TemplateSubmission, MAX_NAME_LEN};
use crate::types::DbId;
use crate::workflow::WorkflowType;

/// One task being edited. The `key` identifies the task for the lifetime of
/// the editing session only and is never persisted; `persisted_id` is the
/// database id when the draft was loaded from a saved template.
#[derive(Debug, Clone)]
pub struct DraftTask {
    pub key: Uuid,
    pub persisted_id: Option<DbId>,
    pub task_name: String,
    pub description: String,
    pub assigned_role: UserRole,
    pub is_parallel: bool,
    /// Surrogate key of a task positioned strictly earlier in the list.
    pub dependency: Option<Uuid>,
}

impl DraftTask {
    fn new() -> Self {
        DraftTask {
            key: Uuid::new_v4(),
            persisted_id: None,
            task_name: String::new(),
            description: String::new(),
            assigned_role: UserRole::HrAdmin,
            is_parallel: false,
            dependency: None,
        }
    }
}

/// A dependency candidate offered for a given task position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyOption {
    pub key: Uuid,
    pub label: String,
}

/// Editing session for a new or existing workflow template.
#[derive(Debug, Clone)]
pub struct TemplateDraft {
    /// `Some` when editing a saved template, `None` for a new one.
    pub template_id: Option<DbId>,
    pub name: String,
    pub description: String,
    pub workflow_type: WorkflowType,
    pub is_active: bool,
    tasks: Vec<DraftTask>,
}

impl TemplateDraft {
    /// Start a blank draft for a new template.
    pub fn new(workflow_type: WorkflowType) -> Self {
        TemplateDraft {
            template_id: None,
            name: String::new(),
            description: String::new(),
            workflow_type,
            is_active: true,
            tasks: Vec::new(),
        }
    }

    /// Hydrate a draft from a saved template's detail, resolving persisted
    /// dependency ids onto the new surrogate keys. Tasks are taken in the
    /// order given, which is the template's sequence order.
    pub fn from_detail(
        template_id: DbId,
        name: impl Into<String>,
        description: Option<String>,
        workflow_type: WorkflowType,
        is_active: bool,
        tasks: &[TaskDefinition],
    ) -> Self {
        let mut draft_tasks: Vec<DraftTask> = tasks
            .iter()
            .map(|t| DraftTask {
                key: Uuid::new_v4(),
                persisted_id: t.id,
                task_name: t.task_name.clone(),
                description: t.description.clone().unwrap_or_default(),
                assigned_role: t.assigned_role,
                is_parallel: t.is_parallel,
                dependency: None,
            })
            .collect();

        // Second pass: map each persisted dependency id to the surrogate key
        // of the task that carries it. Unresolvable ids stay None.
        for (i, source) in tasks.iter().enumerate() {
            if let Some(dep_id) = source.dependency_task_id {
                let target = draft_tasks
                    .iter()
                    .take(i)
                    .find(|d| d.persisted_id == Some(dep_id))
                    .map(|d| d.key);
                draft_tasks[i].dependency = target;
            }
        }

        TemplateDraft {
            template_id: Some(template_id),
            name: name.into(),
            description: description.unwrap_or_default(),
            workflow_type,
            is_active,
            tasks: draft_tasks,
        }
    }

    pub fn tasks(&self) -> &[DraftTask] {
        &self.tasks
    }

    pub fn task_mut(&mut self, index: usize) -> Option<&mut DraftTask> {
        self.tasks.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Whether the move-up control should be disabled at `index`.
    pub fn is_first(&self, index: usize) -> bool {
        index == 0
    }

    /// Whether the move-down control should be disabled at `index`.
    pub fn is_last(&self, index: usize) -> bool {
        !self.tasks.is_empty() && index == self.tasks.len() - 1
    }

    /// Append a new task with defaults and return its surrogate key.
    /// There is no upper bound on task count.
    pub fn add_task(&mut self) -> Uuid {
        let task = DraftTask::new();
        let key = task.key;
        self.tasks.push(task);
        key
    }

    /// Swap the task at `index` with its predecessor. No-op at index 0 or
    /// out of bounds; returns whether a move happened.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.tasks.len() {
            return false;
        }
        self.tasks.swap(index, index - 1);
        self.revalidate_dependencies();
        true
    }

    /// Swap the task at `index` with its successor. No-op at the last index
    /// or out of bounds; returns whether a move happened.
    pub fn move_down(&mut self, index: usize) -> bool {
        if self.tasks.is_empty() || index >= self.tasks.len() - 1 {
            return false;
        }
        self.tasks.swap(index, index + 1);
        self.revalidate_dependencies();
        true
    }

    /// Remove the task at `index`, but only when the caller has confirmed
    /// the removal. Returns whether the list changed. Dependencies pointing
    /// at the removed task are cleared.
    pub fn remove_task(&mut self, index: usize, confirmed: bool) -> bool {
        if !confirmed || index >= self.tasks.len() {
            return false;
        }
        self.tasks.remove(index);
        self.revalidate_dependencies();
        true
    }

    /// Point the task at `index` at a dependency, or clear it with `None`.
    /// The target must be positioned strictly earlier in the list; returns
    /// whether the assignment was accepted.
    pub fn set_dependency(&mut self, index: usize, target: Option<Uuid>) -> bool {
        if index >= self.tasks.len() {
            return false;
        }
        match target {
            None => {
                self.tasks[index].dependency = None;
                true
            }
            Some(key) => {
                let valid = self.tasks[..index].iter().any(|t| t.key == key);
                if valid {
                    self.tasks[index].dependency = Some(key);
                }
                valid
            }
        }
    }

    /// Dependency candidates for the task at `index`: exactly the tasks at
    /// positions `[0, index)`, labeled by position and name.
    pub fn dependency_options_for(&self, index: usize) -> Vec<DependencyOption> {
        let end = index.min(self.tasks.len());
        self.tasks[..end]
            .iter()
            .enumerate()
            .map(|(i, task)| {
                let name = if task.task_name.is_empty() {
                    "Untitled"
                } else {
                    task.task_name.as_str()
                };
                DependencyOption {
                    key: task.key,
                    label: format!("Task {}: {}", i + 1, name),
                }
            })
            .collect()
    }

    /// Derive the sequence order of every task from list position and the
    /// parallel flag: a parallel task (other than the first) shares its
    /// predecessor's order; every other task starts order `index + 1`.
    pub fn compute_sequence_orders(&self) -> Vec<i32> {
        let mut orders = Vec::with_capacity(self.tasks.len());
        let mut current = 1;
        for (i, task) in self.tasks.iter().enumerate() {
            if !(task.is_parallel && i > 0) {
                current = i as i32 + 1;
            }
            orders.push(current);
        }
        orders
    }

    /// Field-local validation matching what the submit action checks before
    /// any request is issued. Keys follow the wire field paths.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.name.trim().is_empty() {
            errors.insert("name".into(), "Template name is required".into());
        } else if self.name.len() > MAX_NAME_LEN {
            errors.insert(
                "name".into(),
                "Template name must not exceed 255 characters".into(),
            );
        }

        if self.tasks.is_empty() {
            errors.insert("tasks".into(), "Template must have at least one task".into());
        }

        for (i, task) in self.tasks.iter().enumerate() {
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
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Serialize the draft for submission.
    ///
    /// Sequence orders are computed here, never stored. For a never-saved
    /// template every `dependencyTaskId` is serialized as null: the tasks
    /// have no persisted ids yet and the server derives dependencies from
    /// sequence order. In edit mode a dependency resolves to the target
    /// task's persisted id, or null when the target itself is unsaved.
    pub fn to_submission(&self) -> TemplateSubmission {
        let orders = self.compute_sequence_orders();
        let is_new = self.template_id.is_none();

        let tasks = self
            .tasks
            .iter()
            .zip(orders)
            .map(|(task, sequence_order)| {
                let dependency_task_id = if is_new {
                    None
                } else {
                    task.dependency.and_then(|key| {
                        self.tasks
                            .iter()
                            .find(|t| t.key == key)
                            .and_then(|t| t.persisted_id)
                    })
                };
                TaskDefinition {
                    id: task.persisted_id,
                    task_name: task.task_name.clone(),
                    description: if task.description.is_empty() {
                        None
                    } else {
                        Some(task.description.clone())
                    },
                    assigned_role: task.assigned_role,
                    sequence_order,
                    is_parallel: task.is_parallel,
                    dependency_task_id,
                }
            })
            .collect();

        TemplateSubmission {
            name: self.name.clone(),
            description: if self.description.is_empty() {
                None
            } else {
                Some(self.description.clone())
            },
            workflow_type: self.workflow_type,
            tasks,
            is_active: self.template_id.map(|_| self.is_active),
        }
    }

    /// Clear every dependency that no longer points at a strictly-earlier
    /// task. Invoked after each structural mutation.
    fn revalidate_dependencies(&mut self) {
        let keys: Vec<Uuid> = self.tasks.iter().map(|t| t.key).collect();
        for (i, task) in self.tasks.iter_mut().enumerate() {
            if let Some(dep) = task.dependency {
                let backward = keys[..i].contains(&dep);
                if !backward {
                    task.dependency = None;
                }
            }
        }
    }
}
