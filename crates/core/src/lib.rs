//! Domain logic for the Employee Lifecycle Management platform.
//!
//! This crate has zero internal dependencies so it can be used by the
//! repository layer, the API, and any future tooling. It holds the shared
//! types and enums, the template draft editor, the task-graph validation
//! rules, and the custom-field form engine.

pub mod custom_fields;
pub mod error;
pub mod roles;
pub mod template_draft;
pub mod template_rules;
pub mod types;
pub mod workflow;
