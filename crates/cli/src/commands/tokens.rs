//! Token maintenance commands.

use greengrocer_server::db::tokens::TokenRepository;

/// Delete expired, unused tokens.
pub async fn cleanup() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    let deleted = TokenRepository::new(&pool).delete_expired().await?;

    tracing::info!(deleted, "Expired tokens deleted");
    Ok(())
}
