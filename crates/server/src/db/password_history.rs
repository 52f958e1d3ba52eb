//! Password history repository.
//!
//! Append-only audit trail of password hashes. Nothing in the sign-in path
//! reads it; it exists for audit and future reuse-prevention policies.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use greengrocer_core::{AccountId, PasswordHistoryId};

use super::RepositoryError;
use crate::models::PasswordHistoryEntry;

/// Internal row type for history queries.
#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    id: PasswordHistoryId,
    account_id: AccountId,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<HistoryRow> for PasswordHistoryEntry {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            account_id: row.account_id,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

/// Repository for the password audit trail.
pub struct PasswordHistoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PasswordHistoryRepository<'a> {
    /// Create a new history repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append a hash snapshot for an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn append(
        &self,
        account_id: AccountId,
        password_hash: &str,
    ) -> Result<PasswordHistoryEntry, RepositoryError> {
        let row: HistoryRow = sqlx::query_as(
            "INSERT INTO password_history (account_id, password_hash) VALUES ($1, $2) \
             RETURNING id, account_id, password_hash, created_at",
        )
        .bind(account_id)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }
}
