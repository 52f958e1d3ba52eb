//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `GREENGROCER_DATABASE_URL` - `PostgreSQL` connection string
//! - `GREENGROCER_BASE_URL` - Public URL of this API (confirmation links point here)
//! - `FEED_BASE_URL` - Base URL of the external product feed
//! - `SMTP_HOST` - SMTP relay host
//! - `SMTP_USERNAME` - SMTP username
//! - `SMTP_PASSWORD` - SMTP password
//! - `SMTP_FROM` - Sender address for transactional mail
//!
//! ## Optional
//! - `GREENGROCER_HOST` - Bind address (default: 127.0.0.1)
//! - `GREENGROCER_PORT` - Listen port (default: 5264)
//! - `PASSWORD_RESET_URL` - Frontend reset page the reset link points at
//!   (default: <http://localhost:3000/password>)
//! - `CORS_ALLOWED_ORIGIN` - SPA origin allowed to call the API with
//!   credentials (default: <http://localhost:3000>)
//! - `SMTP_PORT` - SMTP relay port (default: 587)
//! - `ACCOUNTS_ASSIGN_ROLE` - Assign the requested role at registration (default: true)
//! - `ACCOUNTS_SEND_CONFIRMATION_EMAIL` - Send the confirmation mail (default: true)
//! - `ACCOUNTS_RECORD_PASSWORD_HISTORY` - Snapshot password hashes (default: true)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of this API; confirmation links embed it
    pub base_url: String,
    /// Frontend page the password-reset link points at
    pub password_reset_url: String,
    /// SPA origin allowed to call the API with credentials
    pub cors_allowed_origin: String,
    /// External product feed configuration
    pub feed: FeedConfig,
    /// SMTP configuration for transactional mail
    pub email: EmailConfig,
    /// Feature variants for the account orchestration
    pub account_features: AccountFeatures,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// External product feed configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Base URL of the feed (serves `/products` and `/product-sales`)
    pub base_url: String,
}

/// SMTP configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP relay host
    pub smtp_host: String,
    /// SMTP relay port
    pub smtp_port: u16,
    /// SMTP username
    pub smtp_username: String,
    /// SMTP password
    pub smtp_password: SecretString,
    /// Sender address for transactional mail
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

/// Feature variants for the account orchestration.
///
/// One orchestration function per use case; these switches select the
/// registration-time extras instead of forked controller copies.
#[derive(Debug, Clone, Copy)]
pub struct AccountFeatures {
    /// Assign the role named in the registration request
    pub assign_role: bool,
    /// Send the confirmation email after registration
    pub send_confirmation_email: bool,
    /// Snapshot password hashes into the audit trail
    pub record_password_history: bool,
}

impl Default for AccountFeatures {
    fn default() -> Self {
        Self {
            assign_role: true,
            send_confirmation_email: true,
            record_password_history: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("GREENGROCER_DATABASE_URL")?;
        let host = get_env_or_default("GREENGROCER_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("GREENGROCER_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("GREENGROCER_PORT", "5264")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("GREENGROCER_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("GREENGROCER_BASE_URL")?;
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("GREENGROCER_BASE_URL".to_string(), e.to_string())
        })?;
        let password_reset_url =
            get_env_or_default("PASSWORD_RESET_URL", "http://localhost:3000/password");
        let cors_allowed_origin =
            get_env_or_default("CORS_ALLOWED_ORIGIN", "http://localhost:3000");

        let feed = FeedConfig::from_env()?;
        let email = EmailConfig::from_env()?;
        let account_features = AccountFeatures::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            password_reset_url,
            cors_allowed_origin,
            feed,
            email,
            account_features,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl FeedConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: get_required_env("FEED_BASE_URL")?,
        })
    }
}

impl EmailConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            smtp_host: get_required_env("SMTP_HOST")?,
            smtp_port: get_env_or_default("SMTP_PORT", "587").parse::<u16>().map_err(
                |e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()),
            )?,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_validated_secret("SMTP_PASSWORD")?,
            from_address: get_required_env("SMTP_FROM")?,
        })
    }
}

impl AccountFeatures {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            assign_role: get_bool_env("ACCOUNTS_ASSIGN_ROLE", true)?,
            send_confirmation_email: get_bool_env("ACCOUNTS_SEND_CONFIRMATION_EMAIL", true)?,
            record_password_history: get_bool_env("ACCOUNTS_RECORD_PASSWORD_HISTORY", true)?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    // Try primary key first (e.g., GREENGROCER_DATABASE_URL)
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    // Fallback to generic DATABASE_URL
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a boolean environment variable with a default value.
fn get_bool_env(key: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(key) {
        Ok(value) => match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("expected a boolean, got '{other}'"),
            )),
        },
        Err(_) => Ok(default),
    }
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        // "ab" has entropy of 1 bit per char (50% a, 50% b)
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_shannon_entropy_high() {
        // Random-looking string should have high entropy
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-smtp-key-here", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_changeme() {
        let result = validate_secret_strength("changeme123", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        // High-entropy random string
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            database_url: SecretString::from("postgres://localhost/test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 5264,
            base_url: "http://localhost:5264".to_string(),
            password_reset_url: "http://localhost:3000/password".to_string(),
            cors_allowed_origin: "http://localhost:3000".to_string(),
            feed: FeedConfig {
                base_url: "http://feed.local".to_string(),
            },
            email: EmailConfig {
                smtp_host: "smtp.local".to_string(),
                smtp_port: 587,
                smtp_username: "mailer".to_string(),
                smtp_password: SecretString::from("hunter2hunter2"),
                from_address: "noreply@freshfruits.example".to_string(),
            },
            account_features: AccountFeatures::default(),
            sentry_dsn: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 5264);
    }

    #[test]
    fn test_email_config_debug_redacts_password() {
        let config = EmailConfig {
            smtp_host: "smtp.local".to_string(),
            smtp_port: 587,
            smtp_username: "mailer".to_string(),
            smtp_password: SecretString::from("super_secret_smtp_password"),
            from_address: "noreply@freshfruits.example".to_string(),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("smtp.local"));
        assert!(debug_output.contains("mailer"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_smtp_password"));
    }

    #[test]
    fn test_account_features_default() {
        let features = AccountFeatures::default();
        assert!(features.assign_role);
        assert!(features.send_confirmation_email);
        assert!(features.record_password_history);
    }
}
