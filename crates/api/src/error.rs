//! HTTP error mapping.
//!
//! Every failure leaving a handler is an [`AppError`], rendered as
//! `{"error", "code"}` JSON. Field-level validation failures additionally
//! carry a `fieldErrors` map keyed by wire field path, which the console
//! applies back onto the offending inputs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use elms_core::error::CoreError;
use elms_core::template_rules::FieldErrors;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Domain error from `elms_core`, mapped by variant below.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Per-field messages for a 400, keyed like `tasks[2].taskName`.
    #[error("Validation failed for {} field(s)", .0.len())]
    FieldValidation(FieldErrors),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::FieldValidation(field_errors) => {
                let body = json!({
                    "error": "Validation Failed",
                    "code": "VALIDATION_ERROR",
                    "fieldErrors": field_errors,
                });
                (StatusCode::BAD_REQUEST, axum::Json(body)).into_response()
            }
            AppError::Core(core) => {
                let (status, code, message) = core_parts(core);
                respond(status, code, message)
            }
            AppError::Database(err) => {
                let (status, code, message) = database_parts(&err);
                respond(status, code, message)
            }
            AppError::BadRequest(msg) => respond(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        }
    }
}

fn respond(status: StatusCode, code: &str, message: String) -> Response {
    let body = json!({ "error": message, "code": code });
    (status, axum::Json(body)).into_response()
}

fn internal() -> Response {
    respond(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".into(),
    )
}

fn core_parts(core: CoreError) -> (StatusCode, &'static str, String) {
    match core {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".into(),
            )
        }
    }
}

/// `RowNotFound` is a 404; a violated `uq_*` unique constraint is a 409.
/// Anything else is logged and sanitized to a 500.
fn database_parts(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    if matches!(err, sqlx::Error::RowNotFound) {
        return (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".into(),
        );
    }

    if let sqlx::Error::Database(db_err) = err {
        if db_err.code().as_deref() == Some("23505") {
            let constraint = db_err.constraint().unwrap_or("unknown");
            if constraint.starts_with("uq_") {
                return (
                    StatusCode::CONFLICT,
                    "CONFLICT",
                    format!("Duplicate value violates unique constraint: {constraint}"),
                );
            }
        }
    }

    tracing::error!(error = %err, "Database error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".into(),
    )
}

/// Flatten `validator` derive output into the field-errors shape, keeping
/// the first message per field.
pub fn field_errors_from_validator(errors: &validator::ValidationErrors) -> FieldErrors {
    let mut map = FieldErrors::new();
    for (field, messages) in errors.field_errors() {
        if let Some(error) = messages.first() {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("{field} is invalid"));
            map.insert(field.to_string(), message);
        }
    }
    map
}
