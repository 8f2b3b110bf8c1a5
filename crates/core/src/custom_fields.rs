//! Custom-field schemas and the dynamic form engine.
//!
//! Templates may declare typed custom fields with conditional visibility
//! rules. [`FormState`] binds a schema to a value map and evaluates
//! visibility from the current values on every read; nothing is cached.
//! The same evaluation backs the server-side submission contract: values
//! for fields that are not visible at submission time are dropped.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Input widget type of a custom field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "TEXT", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Boolean,
    Select,
}

/// Comparison applied by a conditional visibility rule.
///
/// Operators unknown to this build deserialize as [`Other`] and evaluate as
/// a match (fail-open): hiding a field over an operator we cannot interpret
/// would silently drop data the server may require.
///
/// [`Other`]: ConditionalOperator::Other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionalOperator {
    Equals,
    NotEquals,
    Contains,
    #[serde(other)]
    Other,
}

/// A single visibility rule referencing a sibling field by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalRule {
    pub target_field_name: String,
    pub operator: ConditionalOperator,
    pub value: Value,
}

/// Schema of one template custom field, supplied by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    pub name: String,
    pub label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(default)]
    pub select_options: Option<Vec<String>>,
    #[serde(default)]
    pub conditional_rules: Option<Vec<ConditionalRule>>,
}

/// Evaluate one rule against the current value of its target field.
///
/// A missing target value is treated as JSON null.
pub fn rule_matches(rule: &ConditionalRule, target_value: Option<&Value>) -> bool {
    let current = target_value.unwrap_or(&Value::Null);
    match rule.operator {
        ConditionalOperator::Equals => current == &rule.value,
        ConditionalOperator::NotEquals => current != &rule.value,
        ConditionalOperator::Contains => match (current.as_str(), rule.value.as_str()) {
            (Some(haystack), Some(needle)) => haystack.contains(needle),
            _ => false,
        },
        ConditionalOperator::Other => true,
    }
}

/// A field with no rules is visible; otherwise it is visible iff any rule
/// matches (OR semantics).
pub fn is_field_visible(field: &CustomField, values: &IndexMap<String, Value>) -> bool {
    match &field.conditional_rules {
        None => true,
        Some(rules) if rules.is_empty() => true,
        Some(rules) => rules
            .iter()
            .any(|rule| rule_matches(rule, values.get(&rule.target_field_name))),
    }
}

/// Whether a stored value counts as "filled" for submission purposes.
fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

/// Form state for one template's custom-field schema.
///
/// Owns the schema and an ordered value map. Hidden fields keep their
/// stored values (only rendering and submission ignore them), so toggling
/// a controlling field back restores what the user had entered.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    schema: Vec<CustomField>,
    values: IndexMap<String, Value>,
}

impl FormState {
    /// Bind a schema, seeding values from each field's default.
    pub fn new(schema: Vec<CustomField>) -> Self {
        let mut state = FormState {
            schema,
            values: IndexMap::new(),
        };
        state.apply_defaults();
        state
    }

    /// Switch to a different template's schema. All previously entered
    /// values are dropped so no orphaned keys can leak into a submission
    /// for the new template.
    pub fn reset(&mut self, schema: Vec<CustomField>) {
        self.schema = schema;
        self.values.clear();
        self.apply_defaults();
    }

    fn apply_defaults(&mut self) {
        for field in &self.schema {
            if let Some(default) = &field.default_value {
                self.values.insert(field.name.clone(), default.clone());
            }
        }
    }

    pub fn schema(&self) -> &[CustomField] {
        &self.schema
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Store a value. Unknown names are accepted; the submission filter is
    /// what keeps them out of the payload.
    pub fn set_value(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Visibility of the named field under the current values. Unknown
    /// names are not visible.
    pub fn is_visible(&self, name: &str) -> bool {
        self.schema
            .iter()
            .find(|f| f.name == name)
            .map(|f| is_field_visible(f, &self.values))
            .unwrap_or(false)
    }

    /// The schema fields that should currently be rendered, in order.
    pub fn visible_fields(&self) -> Vec<&CustomField> {
        self.schema
            .iter()
            .filter(|f| is_field_visible(f, &self.values))
            .collect()
    }

    /// Names of required, currently-visible fields that have no filled
    /// value. Required-ness of a hidden field is not enforced.
    pub fn missing_required_fields(&self) -> Vec<&str> {
        missing_required_fields(&self.schema, &self.values)
            .into_iter()
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Build the submission value map: only fields that are currently
    /// visible and filled are included. Stale values of hidden fields stay
    /// in local state but never reach the payload.
    pub fn submission_values(&self) -> IndexMap<String, Value> {
        self.schema
            .iter()
            .filter(|f| is_field_visible(f, &self.values))
            .filter_map(|f| {
                self.values
                    .get(&f.name)
                    .filter(|v| is_filled(v))
                    .map(|v| (f.name.clone(), v.clone()))
            })
            .collect()
    }
}

/// Required, visible fields with no filled value in `values`. Hidden
/// fields are never reported, regardless of their required flag.
pub fn missing_required_fields<'a>(
    schema: &'a [CustomField],
    values: &IndexMap<String, Value>,
) -> Vec<&'a CustomField> {
    schema
        .iter()
        .filter(|f| f.required && is_field_visible(f, values))
        .filter(|f| !values.get(&f.name).is_some_and(is_filled))
        .collect()
}

/// Filter an incoming submission map against a schema: the server-side
/// half of the contract. Keys for unknown fields, hidden fields, or
/// unfilled values are dropped.
pub fn filter_submission_values(
    schema: &[CustomField],
    submitted: &IndexMap<String, Value>,
) -> IndexMap<String, Value> {
    schema
        .iter()
        .filter(|f| is_field_visible(f, submitted))
        .filter_map(|f| {
            submitted
                .get(&f.name)
                .filter(|v| is_filled(v))
                .map(|v| (f.name.clone(), v.clone()))
        })
        .collect()
}
