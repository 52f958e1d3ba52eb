//! Account orchestration.
//!
//! One function per use case: each validates the request, drives the
//! identity service in a fixed sequence, renders and dispatches mail, and
//! maps results onto the response contract. Feature variants (role
//! assignment, confirmation mail, history recording) come from
//! [`crate::config::AccountFeatures`] instead of forked copies of the flow.
//!
//! Mail is handed to a spawned task: registration and forgot-password
//! return their success message regardless of delivery, and a failed send
//! is logged and captured, never turned into a client error.

use sqlx::PgPool;

use greengrocer_core::{AccountId, Email};

use crate::config::ServerConfig;
use crate::error::{AppError, Result};
use crate::models::{Account, TokenPurpose};
use crate::services::email::EmailService;
use crate::services::identity::{IdentityError, IdentityService, SignInOutcome};

/// Response messages. The login failure message is shared by the
/// unknown-email and wrong-password branches on purpose: identical bytes,
/// identical status, nothing for an enumeration probe to distinguish.
pub const MSG_REGISTERED: &str =
    "Registered Successfully. Please check your email to confirm your account.";
pub const MSG_EMAIL_AND_TOKEN_REQUIRED: &str = "Email and Token are required.";
pub const MSG_USER_NOT_FOUND: &str = "User not found.";
pub const MSG_EMAIL_CONFIRMED: &str = "Email confirmed successfully!";
pub const MSG_CONFIRM_FAILED: &str = "Error confirming your email.";
pub const MSG_LOGIN_SUCCESS: &str = "Login successful.";
pub const MSG_CHECK_CREDENTIALS: &str = "Please check your credentials and try again.";
pub const MSG_EMAIL_NOT_CONFIRMED: &str = "Email not confirmed yet.";
pub const MSG_TWO_FACTOR_REQUIRED: &str = "Two-factor authentication required.";
pub const MSG_LOCKED_OUT: &str = "Account locked out due to multiple failed login attempts.";
pub const MSG_FORGOT_FAILED: &str =
    "User with this email does not exist or email is not confirmed.";
pub const MSG_RESET_EMAIL_SENT: &str = "Password reset email sent. Please check your inbox.";
pub const MSG_PASSWORD_RESET: &str = "Password has been reset successfully.";
pub const MSG_RESET_FAILED: &str = "Error resetting your password.";

/// Account orchestrator.
pub struct AccountsService<'a> {
    pool: &'a PgPool,
    email: &'a EmailService,
    config: &'a ServerConfig,
}

impl<'a> AccountsService<'a> {
    /// Create a new account orchestrator.
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: &'a EmailService, config: &'a ServerConfig) -> Self {
        Self {
            pool,
            email,
            config,
        }
    }

    /// Register a new account and dispatch the confirmation mail.
    ///
    /// Validation happens before any write; a rejected request leaves no
    /// partial state.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` with the full violation list on
    /// policy failures, a duplicate email, or an unknown role.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Option<&str>,
    ) -> Result<&'static str> {
        let features = self.config.account_features;
        let identity = IdentityService::new(self.pool);

        let requested_role = if features.assign_role { role } else { None };

        let account = identity
            .create_account(
                email,
                username,
                password,
                requested_role,
                features.record_password_history,
            )
            .await
            .map_err(registration_error)?;

        tracing::info!(account_id = %account.id, "Account registered");

        if features.send_confirmation_email {
            let token = identity
                .issue_token(account.id, TokenPurpose::EmailConfirmation)
                .await
                .map_err(identity_internal)?;

            let link = confirmation_link(&self.config.base_url, &account.email, &token);
            tracing::info!(email = %account.email, "Generated confirmation link");
            self.dispatch_confirmation(account.email.clone(), link);
        }

        Ok(MSG_REGISTERED)
    }

    /// Confirm an email address with a token from the confirmation link.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for missing parameters, an unknown
    /// email, or an invalid/expired/used token.
    pub async fn confirm_email(&self, token: &str, email: &str) -> Result<&'static str> {
        if token.is_empty() || email.is_empty() {
            tracing::warn!("Email confirmation request missing token or email");
            return Err(AppError::BadRequest(MSG_EMAIL_AND_TOKEN_REQUIRED.to_owned()));
        }

        let parsed = Email::parse(email)
            .map_err(|_| AppError::BadRequest(MSG_USER_NOT_FOUND.to_owned()))?;

        // Tolerate clients that re-encode the token into the link
        let decoded = urlencoding::decode(token)
            .map_err(|_| AppError::BadRequest(MSG_CONFIRM_FAILED.to_owned()))?;

        let identity = IdentityService::new(self.pool);
        identity
            .confirm_email(&parsed, &decoded)
            .await
            .map_err(|e| match e {
                IdentityError::AccountNotFound => {
                    tracing::warn!(email = %parsed, "Confirmation attempt for unknown email");
                    AppError::BadRequest(MSG_USER_NOT_FOUND.to_owned())
                }
                IdentityError::InvalidToken => {
                    tracing::warn!(email = %parsed, "Confirmation attempt with invalid token");
                    AppError::BadRequest(MSG_CONFIRM_FAILED.to_owned())
                }
                other => identity_internal(other),
            })?;

        tracing::info!(email = %parsed, "Email confirmed");
        Ok(MSG_EMAIL_CONFIRMED)
    }

    /// Verify credentials and return the account for session establishment.
    ///
    /// Unknown email and wrong password are indistinguishable to the
    /// caller. The unconfirmed-email branch reports its own message first,
    /// as the contract requires.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` for credential failures and
    /// `AppError::BadRequest` for the two-factor and lockout outcomes.
    pub async fn login(&self, email: &str, password: &str) -> Result<Account> {
        let identity = IdentityService::new(self.pool);

        let Ok(parsed) = Email::parse(email) else {
            return Err(AppError::Unauthorized(MSG_CHECK_CREDENTIALS.to_owned()));
        };

        let Some(account) = identity
            .find_by_email(&parsed)
            .await
            .map_err(identity_internal)?
        else {
            tracing::warn!(email = %parsed, "Login attempt for unknown email");
            return Err(AppError::Unauthorized(MSG_CHECK_CREDENTIALS.to_owned()));
        };

        if !account.email_confirmed {
            tracing::warn!(account_id = %account.id, "Login attempt for unconfirmed email");
            return Err(AppError::Unauthorized(MSG_EMAIL_NOT_CONFIRMED.to_owned()));
        }

        match identity.sign_in(&parsed, password).await {
            Ok(SignInOutcome::Succeeded(account)) => {
                tracing::info!(account_id = %account.id, "Login succeeded");
                Ok(account)
            }
            Ok(SignInOutcome::RequiresTwoFactor) => {
                tracing::warn!(account_id = %account.id, "Two-factor authentication required");
                Err(AppError::BadRequest(MSG_TWO_FACTOR_REQUIRED.to_owned()))
            }
            Ok(SignInOutcome::LockedOut) => {
                tracing::warn!(account_id = %account.id, "Login attempt while locked out");
                Err(AppError::BadRequest(MSG_LOCKED_OUT.to_owned()))
            }
            Ok(SignInOutcome::InvalidCredentials) => {
                tracing::warn!(account_id = %account.id, "Invalid login attempt");
                Err(AppError::Unauthorized(MSG_CHECK_CREDENTIALS.to_owned()))
            }
            Err(IdentityError::AccountNotFound) => {
                Err(AppError::Unauthorized(MSG_CHECK_CREDENTIALS.to_owned()))
            }
            Err(other) => Err(identity_internal(other)),
        }
    }

    /// Reload the session profile from the identity store.
    ///
    /// A session can outlive a role change, so the profile endpoint reads
    /// the account per call instead of echoing the session copy.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` if the account no longer exists.
    pub async fn profile(&self, id: AccountId) -> Result<Account> {
        let identity = IdentityService::new(self.pool);

        identity
            .find_by_id(id)
            .await
            .map_err(identity_internal)?
            .ok_or_else(|| AppError::Unauthorized("Authentication required.".to_owned()))
    }

    /// Issue a reset token and dispatch the password-reset mail.
    ///
    /// Unknown and unconfirmed emails fail with the same message.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` when no reset mail can be sent.
    pub async fn forgot_password(&self, email: &str) -> Result<&'static str> {
        let identity = IdentityService::new(self.pool);

        let Ok(parsed) = Email::parse(email) else {
            return Err(AppError::BadRequest(MSG_FORGOT_FAILED.to_owned()));
        };

        let account = identity
            .find_by_email(&parsed)
            .await
            .map_err(identity_internal)?;

        let Some(account) = account.filter(|a| a.email_confirmed) else {
            tracing::warn!(email = %parsed, "Forgot password for unknown or unconfirmed email");
            return Err(AppError::BadRequest(MSG_FORGOT_FAILED.to_owned()));
        };

        let token = identity
            .issue_token(account.id, TokenPurpose::PasswordReset)
            .await
            .map_err(identity_internal)?;

        let link = reset_link(&self.config.password_reset_url, &account.email, &token);
        self.dispatch_password_reset(account.email.clone(), link);

        tracing::info!(email = %account.email, "Password reset email dispatched");
        Ok(MSG_RESET_EMAIL_SENT)
    }

    /// Replace a password using a token from the reset link.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for policy failures and
    /// `AppError::BadRequest` for token problems.
    pub async fn reset_password(
        &self,
        email: &str,
        token: &str,
        new_password: &str,
    ) -> Result<&'static str> {
        let Ok(parsed) = Email::parse(email) else {
            return Err(AppError::BadRequest(MSG_RESET_FAILED.to_owned()));
        };

        let decoded = urlencoding::decode(token)
            .map_err(|_| AppError::BadRequest(MSG_RESET_FAILED.to_owned()))?;

        let identity = IdentityService::new(self.pool);
        identity
            .reset_password(
                &parsed,
                &decoded,
                new_password,
                self.config.account_features.record_password_history,
            )
            .await
            .map_err(|e| match e {
                IdentityError::PolicyViolation(violations) => AppError::Validation(violations),
                IdentityError::AccountNotFound | IdentityError::InvalidToken => {
                    tracing::warn!(email = %parsed, "Password reset attempt rejected");
                    AppError::BadRequest(MSG_RESET_FAILED.to_owned())
                }
                other => identity_internal(other),
            })?;

        tracing::info!(email = %parsed, "Password reset");
        Ok(MSG_PASSWORD_RESET)
    }

    /// Hand the confirmation mail to a background task.
    fn dispatch_confirmation(&self, email: Email, link: String) {
        let mailer = self.email.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send_confirmation_email(email.as_str(), &link).await {
                sentry::capture_error(&e);
                tracing::error!(error = %e, email = %email, "Failed to send confirmation email");
            }
        });
    }

    /// Hand the password-reset mail to a background task.
    fn dispatch_password_reset(&self, email: Email, link: String) {
        let mailer = self.email.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send_password_reset_email(email.as_str(), &link).await {
                sentry::capture_error(&e);
                tracing::error!(error = %e, email = %email, "Failed to send password reset email");
            }
        });
    }
}

/// Build the confirmation link pointing back at this API.
fn confirmation_link(base_url: &str, email: &Email, token: &str) -> String {
    format!(
        "{}/api/accounts/confirmemail?email={}&token={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(email.as_str()),
        urlencoding::encode(token)
    )
}

/// Build the reset link pointing at the frontend reset page.
fn reset_link(password_reset_url: &str, email: &Email, token: &str) -> String {
    format!(
        "{}?email={}&token={}",
        password_reset_url,
        urlencoding::encode(email.as_str()),
        urlencoding::encode(token)
    )
}

/// Map identity failures of a registration onto the error-list contract.
fn registration_error(err: IdentityError) -> AppError {
    match err {
        IdentityError::PolicyViolation(violations) => AppError::Validation(violations),
        IdentityError::EmailTaken => AppError::Validation(vec![
            "An account with this email already exists.".to_owned(),
        ]),
        IdentityError::InvalidEmail(e) => AppError::Validation(vec![e.to_string()]),
        IdentityError::UnknownRole(e) => AppError::Validation(vec![e.to_string()]),
        other => identity_internal(other),
    }
}

/// Map unexpected identity failures onto the internal classes.
fn identity_internal(err: IdentityError) -> AppError {
    match err {
        IdentityError::Repository(e) => AppError::Database(e),
        other => AppError::Internal(other.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_link_encodes_token() {
        let email = Email::parse("alice@example.com").unwrap();
        let link = confirmation_link("http://localhost:5264/", &email, "ab+c/d=");
        assert_eq!(
            link,
            "http://localhost:5264/api/accounts/confirmemail?email=alice%40example.com&token=ab%2Bc%2Fd%3D"
        );
    }

    #[test]
    fn test_reset_link_points_at_frontend() {
        let email = Email::parse("alice@example.com").unwrap();
        let link = reset_link("http://localhost:3000/password", &email, "tok");
        assert_eq!(
            link,
            "http://localhost:3000/password?email=alice%40example.com&token=tok"
        );
    }

    #[test]
    fn test_registration_error_carries_all_violations() {
        let err = registration_error(IdentityError::PolicyViolation(vec![
            "too short".to_owned(),
            "needs a digit".to_owned(),
        ]));
        match err {
            AppError::Validation(violations) => assert_eq!(violations.len(), 2),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_and_wrong_password_share_a_message() {
        // Both branches of login() use this constant; pin it so a future
        // edit cannot split them apart silently.
        assert_eq!(MSG_CHECK_CREDENTIALS, "Please check your credentials and try again.");
    }
}
