//! Repository for the `template_custom_fields` table.

use elms_core::types::DbId;
use sqlx::PgPool;

use crate::models::custom_field::{CreateCustomField, TemplateCustomField};

const COLUMNS: &str = "id, template_id, name, label, field_type, required, \
                        default_value, select_options, conditional_rules, position, created_at";

/// Provides queries for template custom-field definitions.
pub struct CustomFieldRepo;

impl CustomFieldRepo {
    /// Insert a custom field definition, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateCustomField,
    ) -> Result<TemplateCustomField, sqlx::Error> {
        let query = format!(
            "INSERT INTO template_custom_fields
                (template_id, name, label, field_type, required,
                 default_value, select_options, conditional_rules, position)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, TemplateCustomField>(&query)
            .bind(input.template_id)
            .bind(&input.name)
            .bind(&input.label)
            .bind(input.field_type)
            .bind(input.required)
            .bind(&input.default_value)
            .bind(&input.select_options)
            .bind(&input.conditional_rules)
            .bind(input.position)
            .fetch_one(pool)
            .await
    }

    /// List a template's custom fields in declaration order.
    pub async fn list_by_template(
        pool: &PgPool,
        template_id: DbId,
    ) -> Result<Vec<TemplateCustomField>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM template_custom_fields
             WHERE template_id = $1
             ORDER BY position, id"
        );
        sqlx::query_as::<_, TemplateCustomField>(&query)
            .bind(template_id)
            .fetch_all(pool)
            .await
    }
}
