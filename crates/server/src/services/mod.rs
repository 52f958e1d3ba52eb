//! Services: account orchestration, identity, and email delivery.

pub mod accounts;
pub mod email;
pub mod identity;

pub use accounts::AccountsService;
pub use email::{EmailError, EmailService};
pub use identity::{IdentityError, IdentityService, SignInOutcome};
