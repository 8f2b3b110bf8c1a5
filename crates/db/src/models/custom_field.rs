//! Template custom-field schema rows.

use elms_core::custom_fields::{ConditionalRule, CustomField, FieldType};
use elms_core::types::{DbId, Timestamp};
use serde_json::Value;
use sqlx::FromRow;

/// Row from the `template_custom_fields` table.
///
/// `select_options` and `conditional_rules` are stored as JSONB and decoded
/// into their typed forms by [`TemplateCustomField::into_schema_field`].
#[derive(Debug, Clone, FromRow)]
pub struct TemplateCustomField {
    pub id: DbId,
    pub template_id: DbId,
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub default_value: Option<Value>,
    pub select_options: Option<Value>,
    pub conditional_rules: Option<Value>,
    pub position: i32,
    pub created_at: Timestamp,
}

impl TemplateCustomField {
    /// Decode the row into the schema shape consumed by the form engine.
    /// Malformed JSONB payloads decode to `None` rather than failing the
    /// whole template fetch.
    pub fn into_schema_field(self) -> CustomField {
        let select_options: Option<Vec<String>> = self
            .select_options
            .and_then(|v| serde_json::from_value(v).ok());
        let conditional_rules: Option<Vec<ConditionalRule>> = self
            .conditional_rules
            .and_then(|v| serde_json::from_value(v).ok());
        CustomField {
            name: self.name,
            label: self.label,
            field_type: self.field_type,
            required: self.required,
            default_value: self.default_value,
            select_options,
            conditional_rules,
        }
    }
}

/// DTO for inserting a custom field definition.
#[derive(Debug)]
pub struct CreateCustomField {
    pub template_id: DbId,
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    pub required: bool,
    pub default_value: Option<Value>,
    pub select_options: Option<Value>,
    pub conditional_rules: Option<Value>,
    pub position: i32,
}
