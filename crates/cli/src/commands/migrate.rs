//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! gg-cli migrate run
//! ```
//!
//! # Environment Variables
//!
//! - `GREENGROCER_DATABASE_URL` - `PostgreSQL` connection string
//!   (falls back to `DATABASE_URL`)
//!
//! Migration files live in `crates/server/migrations/` and are embedded at
//! compile time.

use super::CliError;

/// Apply pending database migrations.
pub async fn run() -> Result<(), CliError> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
