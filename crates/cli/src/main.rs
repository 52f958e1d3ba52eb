//! Greengrocer CLI - Database migrations and account management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! gg-cli migrate run
//!
//! # Create an account (already confirmed, no email round-trip)
//! gg-cli account create -e manager@freshfruits.example -u manager -p 'S3cure!pass' -r manager
//!
//! # Confirm an email by hand
//! gg-cli account confirm -e alice@example.com
//!
//! # Change a role
//! gg-cli account set-role -e alice@example.com -r manager
//!
//! # Delete expired, unused tokens
//! gg-cli tokens cleanup
//! ```
//!
//! # Commands
//!
//! - `migrate run` - Run database migrations
//! - `account create|confirm|set-role` - Manage accounts
//! - `tokens cleanup` - Delete expired tokens

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "gg-cli")]
#[command(author, version, about = "Greengrocer CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Manage accounts
    Account {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Manage single-use tokens
    Tokens {
        #[command(subcommand)]
        action: TokensAction,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply pending migrations
    Run,
}

#[derive(Subcommand)]
enum AccountAction {
    /// Create a new account, already confirmed
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display username
        #[arg(short, long)]
        username: String,

        /// Password (must satisfy the registration policy)
        #[arg(short, long)]
        password: String,

        /// Role (`admin`, `manager`, `user`)
        #[arg(short, long, default_value = "user")]
        role: String,
    },
    /// Mark an email address as confirmed
    Confirm {
        /// Email address
        #[arg(short, long)]
        email: String,
    },
    /// Change an account's role
    SetRole {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Role (`admin`, `manager`, `user`)
        #[arg(short, long)]
        role: String,
    },
}

#[derive(Subcommand)]
enum TokensAction {
    /// Delete expired, unused tokens
    Cleanup,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { action } => match action {
            MigrateAction::Run => commands::migrate::run().await?,
        },
        Commands::Account { action } => match action {
            AccountAction::Create {
                email,
                username,
                password,
                role,
            } => {
                commands::account::create(&email, &username, &password, &role).await?;
            }
            AccountAction::Confirm { email } => {
                commands::account::confirm(&email).await?;
            }
            AccountAction::SetRole { email, role } => {
                commands::account::set_role(&email, &role).await?;
            }
        },
        Commands::Tokens { action } => match action {
            TokensAction::Cleanup => commands::tokens::cleanup().await?,
        },
    }
    Ok(())
}
