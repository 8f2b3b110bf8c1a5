//! User roles for role-based access control.
//!
//! The role set is closed: every user carries exactly one of these four
//! roles, stored as TEXT in the `users` table and carried verbatim in JWT
//! claims and API payloads (SCREAMING_SNAKE_CASE on the wire).

use serde::{Deserialize, Serialize};

/// Role assigned to a platform user.
///
/// - `HrAdmin`: HR administrators who manage user accounts and initiate workflows
/// - `LineManager`: line managers who oversee employee onboarding tasks
/// - `TechSupport`: technical support staff who handle provisioning and access
/// - `Administrator`: system administrators with elevated privileges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "TEXT", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    HrAdmin,
    LineManager,
    TechSupport,
    Administrator,
}

impl UserRole {
    /// Wire name of the role, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::HrAdmin => "HR_ADMIN",
            UserRole::LineManager => "LINE_MANAGER",
            UserRole::TechSupport => "TECH_SUPPORT",
            UserRole::Administrator => "ADMINISTRATOR",
        }
    }

    /// Parse a wire name back into a role. Returns `None` for unknown names.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "HR_ADMIN" => Some(UserRole::HrAdmin),
            "LINE_MANAGER" => Some(UserRole::LineManager),
            "TECH_SUPPORT" => Some(UserRole::TechSupport),
            "ADMINISTRATOR" => Some(UserRole::Administrator),
            _ => None,
        }
    }

    /// Whether this role may author workflow templates.
    pub fn can_edit_templates(&self) -> bool {
        matches!(self, UserRole::HrAdmin | UserRole::Administrator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_all_roles() {
        for role in [
            UserRole::HrAdmin,
            UserRole::LineManager,
            UserRole::TechSupport,
            UserRole::Administrator,
        ] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn unknown_role_name_fails() {
        assert_eq!(UserRole::parse("SUPER_USER"), None);
        assert_eq!(UserRole::parse(""), None);
    }

    #[test]
    fn template_editing_limited_to_hr_admin_and_administrator() {
        assert!(UserRole::HrAdmin.can_edit_templates());
        assert!(UserRole::Administrator.can_edit_templates());
        assert!(!UserRole::LineManager.can_edit_templates());
        assert!(!UserRole::TechSupport.can_edit_templates());
    }
}
