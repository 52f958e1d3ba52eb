//! Identity service.
//!
//! Owns everything credential-shaped: password policy and hashing, sign-in
//! with lockout tracking, single-use email tokens, and role membership.
//! Callers (the account orchestrator) sequence these operations but never
//! see a hash or a lockout counter directly.

mod error;

pub use error::IdentityError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use greengrocer_core::{AccountId, Email, Role};

use crate::db::RepositoryError;
use crate::db::accounts::AccountRepository;
use crate::db::password_history::PasswordHistoryRepository;
use crate::db::tokens::TokenRepository;
use crate::models::{Account, TokenPurpose};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Failed sign-in attempts before the account is locked.
const MAX_FAILED_LOGINS: i32 = 5;

/// How long a lockout lasts.
const LOCKOUT_MINUTES: i64 = 5;

/// How long confirmation and reset tokens stay valid. The reset email
/// promises 24 hours.
const TOKEN_TTL_HOURS: i64 = 24;

/// Raw token length in bytes before encoding.
const TOKEN_BYTES: usize = 32;

/// Outcome of a password sign-in attempt, checked by callers in order.
#[derive(Debug)]
pub enum SignInOutcome {
    /// Credentials verified; the account is returned.
    Succeeded(Account),
    /// Credentials verified but a second factor is required.
    RequiresTwoFactor,
    /// The account is suspended after repeated failures.
    LockedOut,
    /// Wrong password.
    InvalidCredentials,
}

/// Identity service over the relational store.
pub struct IdentityService<'a> {
    accounts: AccountRepository<'a>,
    tokens: TokenRepository<'a>,
    history: PasswordHistoryRepository<'a>,
}

impl<'a> IdentityService<'a> {
    /// Create a new identity service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            accounts: AccountRepository::new(pool),
            tokens: TokenRepository::new(pool),
            history: PasswordHistoryRepository::new(pool),
        }
    }

    /// Look up an account by email.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Repository` if the query fails.
    pub async fn find_by_email(&self, email: &Email) -> Result<Option<Account>, IdentityError> {
        Ok(self.accounts.get_by_email(email).await?)
    }

    /// Look up an account by ID.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Repository` if the query fails.
    pub async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, IdentityError> {
        Ok(self.accounts.get_by_id(id).await?)
    }

    /// Create an account with the given credential.
    ///
    /// All request validation happens before any write, so a rejected
    /// registration leaves no partial state. The password hash and the
    /// optional first history snapshot are written in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidEmail` / `UnknownRole` /
    /// `PolicyViolation` for request problems, `EmailTaken` on a duplicate,
    /// `Repository` for database failures.
    pub async fn create_account(
        &self,
        email: &str,
        username: &str,
        password: &str,
        role: Option<&str>,
        record_history: bool,
    ) -> Result<Account, IdentityError> {
        let email = Email::parse(email)?;
        let role = match role {
            Some(name) => name.parse::<Role>()?,
            None => Role::default(),
        };

        validate_password(password).map_err(IdentityError::PolicyViolation)?;

        let password_hash = hash_password(password)?;

        let account = self
            .accounts
            .create(&email, username, role, &password_hash, record_history)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => IdentityError::EmailTaken,
                other => IdentityError::Repository(other),
            })?;

        Ok(account)
    }

    /// Change an account's role.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::AccountNotFound` if the account doesn't exist.
    pub async fn assign_role(&self, id: AccountId, role: Role) -> Result<(), IdentityError> {
        self.accounts.set_role(id, role).await.map_err(|e| match e {
            RepositoryError::NotFound => IdentityError::AccountNotFound,
            other => IdentityError::Repository(other),
        })
    }

    /// Issue a single-use token for an account.
    ///
    /// Returns the raw token; only its SHA-256 digest is stored. The token
    /// expires after 24 hours.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::Repository` if the insert fails.
    pub async fn issue_token(
        &self,
        account_id: AccountId,
        purpose: TokenPurpose,
    ) -> Result<String, IdentityError> {
        let raw = generate_token();
        let digest = hash_token(&raw);

        self.tokens
            .create(account_id, purpose, &digest, Duration::hours(TOKEN_TTL_HOURS))
            .await?;

        Ok(raw)
    }

    /// Validate an email-confirmation token and set the confirmation flag.
    ///
    /// A token issued for a different email never matches: the lookup is
    /// keyed by the account. The token is consumed before the flag flips,
    /// so it can succeed at most once.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::AccountNotFound` for an unknown email and
    /// `InvalidToken` for a missing, expired, used, or foreign token.
    pub async fn confirm_email(&self, email: &Email, raw_token: &str) -> Result<(), IdentityError> {
        let account = self
            .accounts
            .get_by_email(email)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        let digest = hash_token(raw_token);
        let token = self
            .tokens
            .find_valid(account.id, TokenPurpose::EmailConfirmation, &digest)
            .await?
            .ok_or(IdentityError::InvalidToken)?;

        self.tokens.mark_used(token.id).await.map_err(|e| match e {
            RepositoryError::NotFound => IdentityError::InvalidToken,
            other => IdentityError::Repository(other),
        })?;

        Ok(self.accounts.set_email_confirmed(account.id).await?)
    }

    /// Verify a password with lockout tracking.
    ///
    /// A wrong password increments the failure counter; the attempt that
    /// reaches the limit locks the account for five minutes and already
    /// reports [`SignInOutcome::LockedOut`]. A correct password resets the
    /// counter before the two-factor check.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::AccountNotFound` if the email is unknown;
    /// callers that need enumeration resistance must not surface that
    /// distinction.
    pub async fn sign_in(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<SignInOutcome, IdentityError> {
        let (account, password_hash) = self
            .accounts
            .get_with_password_hash(email)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        let now = Utc::now();
        if account.is_locked_out(now) {
            return Ok(SignInOutcome::LockedOut);
        }

        if !verify_password(password, &password_hash) {
            let failures = self.accounts.record_failed_login(account.id).await?;
            if failures >= MAX_FAILED_LOGINS {
                self.accounts
                    .lock_until(account.id, now + Duration::minutes(LOCKOUT_MINUTES))
                    .await?;
                return Ok(SignInOutcome::LockedOut);
            }
            return Ok(SignInOutcome::InvalidCredentials);
        }

        self.accounts.reset_lockout(account.id).await?;

        if account.two_factor_enabled {
            return Ok(SignInOutcome::RequiresTwoFactor);
        }

        Ok(SignInOutcome::Succeeded(account))
    }

    /// Validate a reset token and replace the account's password.
    ///
    /// The new password goes through the same policy as registration. The
    /// token is consumed, the lockout state is cleared, and a history
    /// snapshot is appended when recording is on.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::AccountNotFound`, `PolicyViolation`, or
    /// `InvalidToken` as for the operations it composes.
    pub async fn reset_password(
        &self,
        email: &Email,
        raw_token: &str,
        new_password: &str,
        record_history: bool,
    ) -> Result<(), IdentityError> {
        let account = self
            .accounts
            .get_by_email(email)
            .await?
            .ok_or(IdentityError::AccountNotFound)?;

        validate_password(new_password).map_err(IdentityError::PolicyViolation)?;

        let digest = hash_token(raw_token);
        let token = self
            .tokens
            .find_valid(account.id, TokenPurpose::PasswordReset, &digest)
            .await?
            .ok_or(IdentityError::InvalidToken)?;

        self.tokens.mark_used(token.id).await.map_err(|e| match e {
            RepositoryError::NotFound => IdentityError::InvalidToken,
            other => IdentityError::Repository(other),
        })?;

        let password_hash = hash_password(new_password)?;
        self.accounts.update_password(account.id, &password_hash).await?;

        if record_history {
            self.history.append(account.id, &password_hash).await?;
        }

        self.accounts.reset_lockout(account.id).await?;

        Ok(())
    }
}

/// Validate a password against the policy, collecting every violation.
///
/// The full list goes back to the client so one round-trip reports
/// everything wrong with the password.
fn validate_password(password: &str) -> Result<(), Vec<String>> {
    let mut violations = Vec::new();

    if password.len() < MIN_PASSWORD_LENGTH {
        violations.push(format!(
            "Passwords must be at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        violations.push("Passwords must have at least one digit ('0'-'9').".to_owned());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        violations.push("Passwords must have at least one lowercase ('a'-'z').".to_owned());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        violations.push("Passwords must have at least one uppercase ('A'-'Z').".to_owned());
    }
    if password.chars().all(char::is_alphanumeric) {
        violations.push("Passwords must have at least one non alphanumeric character.".to_owned());
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, IdentityError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| IdentityError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a raw token: 32 random bytes, base64url without padding.
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Digest a raw token for storage and lookup.
fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_password_accepts_strong() {
        assert!(validate_password("P@ssw0rd").is_ok());
        assert!(validate_password("Str0ng!Passphrase").is_ok());
    }

    #[test]
    fn test_validate_password_collects_all_violations() {
        let violations = validate_password("abc").unwrap_err();
        // Too short, no digit, no uppercase, no non-alphanumeric
        assert_eq!(violations.len(), 4);
    }

    #[test]
    fn test_validate_password_single_violation() {
        let violations = validate_password("Passw0rdd").unwrap_err();
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("non alphanumeric"));
    }

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let hash = hash_password("P@ssw0rd").unwrap();
        assert!(verify_password("P@ssw0rd", &hash));
        assert!(!verify_password("p@ssw0rd", &hash));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(!verify_password("P@ssw0rd", "not-a-phc-string"));
    }

    #[test]
    fn test_generate_token_is_url_safe() {
        let token = generate_token();
        // 32 bytes -> 43 base64url chars without padding
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_generate_token_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn test_hash_token_deterministic() {
        let raw = generate_token();
        assert_eq!(hash_token(&raw), hash_token(&raw));
        assert_ne!(hash_token(&raw), hash_token("other"));
    }
}
