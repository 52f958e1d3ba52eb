//! Account repository for database operations.
//!
//! Queries use the sqlx runtime API with typed row structs; domain
//! conversion happens in `TryFrom` so corruption is reported, not trusted.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use greengrocer_core::{AccountId, Email, Role};

use super::RepositoryError;
use crate::models::Account;

/// Internal row type for account queries.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: AccountId,
    email: String,
    username: String,
    role: Role,
    email_confirmed: bool,
    two_factor_enabled: bool,
    failed_logins: i32,
    locked_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            username: row.username,
            role: row.role,
            email_confirmed: row.email_confirmed,
            two_factor_enabled: row.two_factor_enabled,
            failed_logins: row.failed_logins,
            locked_until: row.locked_until,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const ACCOUNT_COLUMNS: &str = "id, email, username, role, email_confirmed, \
     two_factor_enabled, failed_logins, locked_until, created_at, updated_at";

/// Repository for account database operations.
pub struct AccountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an account by its email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get an account by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Create a new account with its password hash, in one transaction.
    ///
    /// Optionally appends the first password-history snapshot inside the
    /// same transaction so a failure leaves no partial state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        email: &Email,
        username: &str,
        role: Role,
        password_hash: &str,
        record_history: bool,
    ) -> Result<Account, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: AccountRow = sqlx::query_as(&format!(
            "INSERT INTO account (email, username, role) VALUES ($1, $2, $3) \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(email.as_str())
        .bind(username)
        .bind(role)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("email already exists".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        sqlx::query("INSERT INTO account_password (account_id, password_hash) VALUES ($1, $2)")
            .bind(row.id)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;

        if record_history {
            sqlx::query("INSERT INTO password_history (account_id, password_hash) VALUES ($1, $2)")
                .bind(row.id)
                .bind(password_hash)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        row.try_into()
    }

    /// Get an account together with its current password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(Account, String)>, RepositoryError> {
        #[derive(sqlx::FromRow)]
        struct HashRow {
            #[sqlx(flatten)]
            account: AccountRow,
            password_hash: String,
        }

        let row: Option<HashRow> = sqlx::query_as(
            "SELECT a.id, a.email, a.username, a.role, a.email_confirmed, \
                    a.two_factor_enabled, a.failed_logins, a.locked_until, \
                    a.created_at, a.updated_at, p.password_hash \
             FROM account a \
             JOIN account_password p ON p.account_id = a.id \
             WHERE a.email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((r.account.try_into()?, r.password_hash))),
            None => Ok(None),
        }
    }

    /// Replace an account's current password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account has no password row.
    pub async fn update_password(
        &self,
        id: AccountId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE account_password SET password_hash = $1, updated_at = NOW() \
             WHERE account_id = $2",
        )
        .bind(password_hash)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Set the email-confirmed flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account doesn't exist.
    pub async fn set_email_confirmed(&self, id: AccountId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE account SET email_confirmed = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Change an account's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account doesn't exist.
    pub async fn set_role(&self, id: AccountId, role: Role) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE account SET role = $1, updated_at = NOW() WHERE id = $2")
                .bind(role)
                .bind(id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Record one failed sign-in attempt and return the new counter value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account doesn't exist.
    pub async fn record_failed_login(&self, id: AccountId) -> Result<i32, RepositoryError> {
        let count: Option<(i32,)> = sqlx::query_as(
            "UPDATE account SET failed_logins = failed_logins + 1, updated_at = NOW() \
             WHERE id = $1 RETURNING failed_logins",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        count.map(|(c,)| c).ok_or(RepositoryError::NotFound)
    }

    /// Suspend sign-in for an account until the given time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account doesn't exist.
    pub async fn lock_until(
        &self,
        id: AccountId,
        until: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE account SET locked_until = $1, updated_at = NOW() WHERE id = $2")
                .bind(until)
                .bind(id)
                .execute(self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Clear the lockout state after a successful sign-in.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account doesn't exist.
    pub async fn reset_lockout(&self, id: AccountId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE account SET failed_logins = 0, locked_until = NULL, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
