//! Account domain types.
//!
//! These types represent validated domain objects for the identity store.
//! Password hashes never appear on `Account` itself; repositories hand them
//! out separately where verification needs them.

use chrono::{DateTime, Utc};

use greengrocer_core::{AccountId, Email, PasswordHistoryId, Role, TokenId};

/// An account (domain type).
#[derive(Debug, Clone)]
pub struct Account {
    /// Unique account ID.
    pub id: AccountId,
    /// Email address, unique and immutable after creation. The login key.
    pub email: Email,
    /// Display username chosen at registration.
    pub username: String,
    /// Assigned role. Exactly one; defaults to [`Role::User`].
    pub role: Role,
    /// Whether the confirmation link for this email has been followed.
    pub email_confirmed: bool,
    /// Whether sign-in requires a second factor.
    pub two_factor_enabled: bool,
    /// Consecutive failed sign-in attempts since the last success.
    pub failed_logins: i32,
    /// If set and in the future, sign-in is suspended until then.
    pub locked_until: Option<DateTime<Utc>>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Returns true if the account is currently locked out.
    #[must_use]
    pub fn is_locked_out(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

/// Purpose of an [`AccountToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "token_purpose", rename_all = "snake_case")]
pub enum TokenPurpose {
    /// Proves control of the registered email address.
    EmailConfirmation,
    /// Authorizes a password reset.
    PasswordReset,
}

/// A single-use account token (domain type).
///
/// Only the SHA-256 digest of the token is stored; the raw token travels in
/// the email link and is never persisted.
#[derive(Debug, Clone)]
pub struct AccountToken {
    /// Database ID of this token.
    pub id: TokenId,
    /// Account the token was issued for.
    pub account_id: AccountId,
    /// What the token authorizes.
    pub purpose: TokenPurpose,
    /// Hex-encoded SHA-256 digest of the raw token.
    pub token_hash: String,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
    /// When the token was used (None if unused).
    pub used_at: Option<DateTime<Utc>>,
    /// When the token was issued.
    pub created_at: DateTime<Utc>,
}

impl AccountToken {
    /// Returns true if this token has already been used.
    #[must_use]
    pub const fn is_used(&self) -> bool {
        self.used_at.is_some()
    }

    /// Returns true if this token has expired.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Returns true if this token can still be used.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.is_used() && !self.is_expired(now)
    }
}

/// An entry in the append-only password audit trail.
#[derive(Debug, Clone)]
pub struct PasswordHistoryEntry {
    /// Database ID of this entry.
    pub id: PasswordHistoryId,
    /// Account the snapshot belongs to.
    pub account_id: AccountId,
    /// Hashed password snapshot.
    pub password_hash: String,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn account_with_lock(locked_until: Option<DateTime<Utc>>) -> Account {
        Account {
            id: AccountId::new(1),
            email: Email::parse("alice@example.com").expect("valid email"),
            username: "alice".to_string(),
            role: Role::User,
            email_confirmed: true,
            two_factor_enabled: false,
            failed_logins: 0,
            locked_until,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_lockout_window() {
        let now = Utc::now();
        assert!(!account_with_lock(None).is_locked_out(now));
        assert!(account_with_lock(Some(now + Duration::minutes(5))).is_locked_out(now));
        assert!(!account_with_lock(Some(now - Duration::seconds(1))).is_locked_out(now));
    }

    #[test]
    fn test_token_validity() {
        let now = Utc::now();
        let token = AccountToken {
            id: TokenId::new(1),
            account_id: AccountId::new(1),
            purpose: TokenPurpose::EmailConfirmation,
            token_hash: "abc".to_string(),
            expires_at: now + Duration::hours(24),
            used_at: None,
            created_at: now,
        };
        assert!(token.is_valid(now));

        let used = AccountToken {
            used_at: Some(now),
            ..token.clone()
        };
        assert!(!used.is_valid(now));

        let expired = AccountToken {
            expires_at: now - Duration::seconds(1),
            ..token
        };
        assert!(!expired.is_valid(now));
    }
}
