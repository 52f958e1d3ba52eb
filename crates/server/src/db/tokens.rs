//! Account token repository.
//!
//! Stores the SHA-256 digests of single-use confirmation and reset tokens.
//! The raw token only ever exists in the email link.

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use greengrocer_core::{AccountId, TokenId};

use super::RepositoryError;
use crate::models::{AccountToken, TokenPurpose};

/// Internal row type for token queries.
#[derive(Debug, sqlx::FromRow)]
struct TokenRow {
    id: TokenId,
    account_id: AccountId,
    purpose: TokenPurpose,
    token_hash: String,
    expires_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<TokenRow> for AccountToken {
    fn from(row: TokenRow) -> Self {
        Self {
            id: row.id,
            account_id: row.account_id,
            purpose: row.purpose,
            token_hash: row.token_hash,
            expires_at: row.expires_at,
            used_at: row.used_at,
            created_at: row.created_at,
        }
    }
}

/// Repository for account token operations.
pub struct TokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TokenRepository<'a> {
    /// Create a new token repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new token digest with the given time to live.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        account_id: AccountId,
        purpose: TokenPurpose,
        token_hash: &str,
        ttl: Duration,
    ) -> Result<AccountToken, RepositoryError> {
        let expires_at = Utc::now() + ttl;

        let row: TokenRow = sqlx::query_as(
            "INSERT INTO account_token (account_id, purpose, token_hash, expires_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, account_id, purpose, token_hash, expires_at, used_at, created_at",
        )
        .bind(account_id)
        .bind(purpose)
        .bind(token_hash)
        .bind(expires_at)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Find an unused, unexpired token matching the digest.
    ///
    /// The account and purpose are part of the lookup: a token issued for a
    /// different email or a different flow never matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_valid(
        &self,
        account_id: AccountId,
        purpose: TokenPurpose,
        token_hash: &str,
    ) -> Result<Option<AccountToken>, RepositoryError> {
        let row: Option<TokenRow> = sqlx::query_as(
            "SELECT id, account_id, purpose, token_hash, expires_at, used_at, created_at \
             FROM account_token \
             WHERE account_id = $1 AND purpose = $2 AND token_hash = $3 \
               AND used_at IS NULL AND expires_at > NOW()",
        )
        .bind(account_id)
        .bind(purpose)
        .bind(token_hash)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Mark a token as used.
    ///
    /// The `used_at IS NULL` guard makes consumption race-safe: only one
    /// caller can flip it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the token doesn't exist or was
    /// already used.
    pub async fn mark_used(&self, id: TokenId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE account_token SET used_at = NOW() WHERE id = $1 AND used_at IS NULL")
                .bind(id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Delete expired, unused tokens (cleanup).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_expired(&self) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM account_token WHERE used_at IS NULL AND expires_at < NOW()")
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}
