//! Shared helpers for Greengrocer integration tests.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`gg-cli migrate run`)
//! - The server running (`cargo run -p greengrocer-server`)
//!
//! Tests mint their own confirmation/reset tokens straight through the
//! identity service against the same database the server uses, because
//! only token digests are stored and the raw token otherwise exists solely
//! in outbound mail.

#![cfg_attr(not(test), forbid(unsafe_code))]

use reqwest::Client;
use secrecy::SecretString;
use sqlx::PgPool;

/// Base URL for the server API (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("SERVER_BASE_URL").unwrap_or_else(|_| "http://localhost:5264".to_string())
}

/// Create an HTTP client with a cookie store, so the session established
/// by login is carried into subsequent requests.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Connect to the database the server is using.
///
/// # Panics
///
/// Panics if the connection environment variable is missing or the
/// connection fails.
pub async fn connect_db() -> PgPool {
    let url = std::env::var("GREENGROCER_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("GREENGROCER_DATABASE_URL must be set for integration tests");

    greengrocer_server::db::create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to database")
}

/// A unique email address per test run, so reruns never collide on the
/// unique constraint.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@integration.test", uuid::Uuid::new_v4())
}
