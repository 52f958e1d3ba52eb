//! Session-related types.
//!
//! Types stored in the server-side session. The client never supplies
//! identity or role; every role-gated read goes through the session.

use serde::{Deserialize, Serialize};

use greengrocer_core::{AccountId, Email, Role};

use crate::models::Account;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user and
/// authorize role-gated reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: AccountId,
    /// User's email address.
    pub email: Email,
    /// User's role, read server-side for authorization.
    pub role: Role,
}

impl From<&Account> for CurrentUser {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            role: account.role,
        }
    }
}

/// Session keys for server-side state.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the shopping cart lines.
    pub const CART: &str = "cart";
}
