//! Domain types for the identity store and session state.

pub mod account;
pub mod session;

pub use account::{Account, AccountToken, PasswordHistoryEntry, TokenPurpose};
pub use session::{CurrentUser, keys as session_keys};
