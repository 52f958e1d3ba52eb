//! CLI command implementations.

pub mod account;
pub mod migrate;
pub mod tokens;

use secrecy::SecretString;
use sqlx::PgPool;

/// Errors shared by CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Account not found: {0}")]
    AccountNotFound(String),
}

/// Connect to the database named by the environment.
///
/// Uses `GREENGROCER_DATABASE_URL` with a fallback to `DATABASE_URL`,
/// matching the server's configuration.
pub async fn connect() -> Result<PgPool, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("GREENGROCER_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| CliError::MissingEnvVar("GREENGROCER_DATABASE_URL"))?;

    Ok(greengrocer_server::db::create_pool(&SecretString::from(database_url)).await?)
}
