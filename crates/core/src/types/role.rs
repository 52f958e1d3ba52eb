//! Account roles.

use serde::{Deserialize, Serialize};

/// Account role, shared by the API contract and server-side authorization.
///
/// The set is closed: role-gated reads compare against these variants, never
/// against free-form strings. `Admin` is a superset of `Manager` for the
/// sales-detail gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "account_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, including everything managers can see.
    Admin,
    /// Can view per-sale detail and the revenue series.
    Manager,
    /// Default role for new registrations.
    #[default]
    User,
}

impl Role {
    /// All roles, in privilege order. Used for validation error messages.
    pub const ALL: [Self; 3] = [Self::Admin, Self::Manager, Self::User];

    /// Whether this role may read per-sale rows and the revenue series.
    #[must_use]
    pub const fn can_view_sales_detail(self) -> bool {
        matches!(self, Self::Admin | Self::Manager)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::User => "user",
        };
        write!(f, "{s}")
    }
}

/// Error parsing a [`Role`] from a string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown role '{0}' (expected one of: admin, manager, user)")]
pub struct RoleParseError(pub String);

impl std::str::FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "manager" => Ok(Self::Manager),
            "user" => Ok(Self::User),
            other => Err(RoleParseError(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("Manager".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("user".parse::<Role>().unwrap(), Role::User);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "superuser".parse::<Role>().unwrap_err();
        assert!(err.to_string().contains("superuser"));
    }

    #[test]
    fn test_display_roundtrip() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
    }

    #[test]
    fn test_sales_detail_gate() {
        assert!(Role::Admin.can_view_sales_detail());
        assert!(Role::Manager.can_view_sales_detail());
        assert!(!Role::User.can_view_sales_detail());
    }

    #[test]
    fn test_default_is_user() {
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn test_serde_snake_case() {
        assert_eq!(serde_json::to_string(&Role::Manager).unwrap(), "\"manager\"");
    }
}
