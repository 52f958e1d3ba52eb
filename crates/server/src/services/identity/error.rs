//! Identity error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur in identity operations.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] greengrocer_core::EmailError),

    /// Unknown role name in a registration request.
    #[error("{0}")]
    UnknownRole(#[from] greengrocer_core::RoleParseError),

    /// Password rejected by policy; carries every violated rule.
    #[error("password validation failed")]
    PolicyViolation(Vec<String>),

    /// An account with this email already exists.
    #[error("email already taken")]
    EmailTaken,

    /// Account not found.
    #[error("account not found")]
    AccountNotFound,

    /// Token missing, expired, already used, or issued for someone else.
    #[error("invalid or expired token")]
    InvalidToken,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
