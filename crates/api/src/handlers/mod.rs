//! Request handlers, one submodule per resource.
//!
//! Handlers delegate to the repositories in `elms_db`, run domain rules from
//! `elms_core`, and map errors via [`AppError`].
//!
//! [`AppError`]: crate::error::AppError

pub mod auth;
pub mod templates;
pub mod users;
pub mod workflows;
