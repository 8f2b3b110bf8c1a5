//! Domain error taxonomy.
//!
//! Each variant corresponds to one HTTP class at the API boundary:
//! 404, 400, 409, 401, 403, 500 in declaration order.

use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("no {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("{0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("internal: {0}")]
    Internal(String),
}
