//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                  - Liveness check
//! GET  /health/ready            - Readiness check (DB ping)
//!
//! # Accounts (JSON)
//! POST /api/accounts/register        - Create an account, dispatch confirmation mail
//! GET  /api/accounts/confirmemail    - Confirm an email (?token=&email=)
//! POST /api/accounts/login           - Verify credentials, establish session
//! POST /api/accounts/logout          - Clear the session user
//! GET  /api/accounts/me              - Session profile (requires auth)
//! POST /api/accounts/forgotpassword  - Dispatch password-reset mail
//! POST /api/accounts/resetpassword   - Replace password with a reset token
//!
//! # Catalog (JSON)
//! GET  /api/catalog/products             - Filtered, paginated product list
//! GET  /api/catalog/products/{id}/sales  - Sales totals; detail is role-gated
//!
//! # Cart (JSON, session-backed)
//! GET  /api/cart         - Cart contents
//! POST /api/cart/add     - Append a product (duplicates allowed)
//! POST /api/cart/remove  - Remove every line with a product id
//! POST /api/cart/clear   - Empty the cart
//! ```

pub mod accounts;
pub mod cart;
pub mod catalog;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the accounts routes router.
pub fn accounts_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(accounts::register))
        .route("/confirmemail", get(accounts::confirm_email))
        .route("/login", post(accounts::login))
        .route("/logout", post(accounts::logout))
        .route("/me", get(accounts::me))
        .route("/forgotpassword", post(accounts::forgot_password))
        .route("/resetpassword", post(accounts::reset_password))
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(catalog::products))
        .route("/products/{id}/sales", get(catalog::product_sales))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create all routes for the server.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/accounts", accounts_routes())
        .nest("/api/catalog", catalog_routes())
        .nest("/api/cart", cart_routes())
}
