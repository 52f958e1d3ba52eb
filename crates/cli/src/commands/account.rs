//! Account management commands.
//!
//! Operator shortcuts around the identity service: create an
//! already-confirmed account, confirm an email by hand, change a role.

use greengrocer_core::{Email, Role};
use greengrocer_server::db::accounts::AccountRepository;
use greengrocer_server::services::IdentityService;

use super::CliError;

/// Create a new account and mark it confirmed.
///
/// The password goes through the same policy as a registration request.
pub async fn create(
    email: &str,
    username: &str,
    password: &str,
    role: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;
    let identity = IdentityService::new(&pool);

    let account = identity
        .create_account(email, username, password, Some(role), true)
        .await?;

    AccountRepository::new(&pool)
        .set_email_confirmed(account.id)
        .await?;

    tracing::info!(
        account_id = %account.id,
        email = %account.email,
        role = %account.role,
        "Account created and confirmed"
    );
    Ok(())
}

/// Mark an email address as confirmed.
pub async fn confirm(email: &str) -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;
    let repository = AccountRepository::new(&pool);

    let parsed = Email::parse(email)?;
    let account = repository
        .get_by_email(&parsed)
        .await?
        .ok_or_else(|| CliError::AccountNotFound(email.to_owned()))?;

    repository.set_email_confirmed(account.id).await?;

    tracing::info!(account_id = %account.id, email = %account.email, "Email confirmed");
    Ok(())
}

/// Change an account's role.
pub async fn set_role(email: &str, role: &str) -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;
    let identity = IdentityService::new(&pool);

    let parsed = Email::parse(email)?;
    let role = role.parse::<Role>()?;

    let account = identity
        .find_by_email(&parsed)
        .await?
        .ok_or_else(|| CliError::AccountNotFound(email.to_owned()))?;

    identity.assign_role(account.id, role).await?;

    tracing::info!(account_id = %account.id, role = %role, "Role updated");
    Ok(())
}
