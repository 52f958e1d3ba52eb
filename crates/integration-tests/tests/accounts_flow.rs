//! Integration tests for the accounts flow.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (gg-cli migrate run)
//! - The server running (cargo run -p greengrocer-server)
//!
//! Run with: cargo test -p greengrocer-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::{Value, json};

use greengrocer_core::Email;
use greengrocer_integration_tests::{base_url, client, connect_db, unique_email};
use greengrocer_server::db::accounts::AccountRepository;
use greengrocer_server::models::TokenPurpose;
use greengrocer_server::services::IdentityService;

/// A password satisfying the registration policy.
const GOOD_PASSWORD: &str = "P@ssw0rd";

/// Register an account via the API and return the response.
async fn register(client: &reqwest::Client, email: &str, username: &str) -> reqwest::Response {
    client
        .post(format!("{}/api/accounts/register", base_url()))
        .json(&json!({
            "username": username,
            "email": email,
            "password": GOOD_PASSWORD,
        }))
        .send()
        .await
        .expect("Failed to send register request")
}

/// Mint a valid token for an account straight through the identity service.
///
/// Raw tokens exist only in outbound mail, so tests create their own
/// against the same database.
async fn mint_token(email: &str, purpose: TokenPurpose) -> String {
    let pool = connect_db().await;
    let parsed = Email::parse(email).expect("valid email");

    let account = AccountRepository::new(&pool)
        .get_by_email(&parsed)
        .await
        .expect("account lookup failed")
        .expect("account should exist");

    IdentityService::new(&pool)
        .issue_token(account.id, purpose)
        .await
        .expect("token issue failed")
}

/// Confirm an email via the API with the given token.
async fn confirm(client: &reqwest::Client, email: &str, token: &str) -> reqwest::Response {
    client
        .get(format!(
            "{}/api/accounts/confirmemail?email={}&token={}",
            base_url(),
            email,
            token
        ))
        .send()
        .await
        .expect("Failed to send confirm request")
}

/// Log in via the API.
async fn login(client: &reqwest::Client, email: &str, password: &str) -> reqwest::Response {
    client
        .post(format!("{}/api/accounts/login", base_url()))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to send login request")
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
#[ignore = "Requires a running server and migrated database"]
async fn test_register_twice_fails_with_duplicate_email() {
    let client = client();
    let email = unique_email("dup");

    let first = register(&client, &email, "dup-user").await;
    assert_eq!(first.status(), StatusCode::OK);
    let body: Value = first.json().await.expect("json body");
    assert_eq!(
        body["message"],
        "Registered Successfully. Please check your email to confirm your account."
    );

    let second = register(&client, &email, "dup-user").await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    let body: Value = second.json().await.expect("json body");
    let errors = body["errors"].as_array().expect("errors array");
    assert!(
        errors
            .iter()
            .any(|e| e.as_str().is_some_and(|s| s.contains("already exists")))
    );
}

#[tokio::test]
#[ignore = "Requires a running server and migrated database"]
async fn test_register_rejects_weak_password_with_error_list() {
    let client = client();

    let resp = client
        .post(format!("{}/api/accounts/register", base_url()))
        .json(&json!({
            "username": "weak",
            "email": unique_email("weak"),
            "password": "short",
        }))
        .send()
        .await
        .expect("Failed to send register request");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("json body");
    let errors = body["errors"].as_array().expect("errors array");
    // Too short, no digit, no uppercase, no non-alphanumeric
    assert_eq!(errors.len(), 4);
}

// ============================================================================
// Email confirmation
// ============================================================================

#[tokio::test]
#[ignore = "Requires a running server and migrated database"]
async fn test_confirm_with_foreign_token_never_sets_the_flag() {
    let client = client();
    let alice = unique_email("alice");
    let mallory = unique_email("mallory");

    assert_eq!(register(&client, &alice, "alice").await.status(), StatusCode::OK);
    assert_eq!(
        register(&client, &mallory, "mallory").await.status(),
        StatusCode::OK
    );

    // A token issued for mallory must not confirm alice
    let foreign_token = mint_token(&mallory, TokenPurpose::EmailConfirmation).await;
    let resp = confirm(&client, &alice, &foreign_token).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("json body");
    assert_eq!(body["message"], "Error confirming your email.");

    // Login still reports the email as unconfirmed
    let resp = login(&client, &alice, GOOD_PASSWORD).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.expect("json body");
    assert_eq!(body["message"], "Email not confirmed yet.");
}

#[tokio::test]
#[ignore = "Requires a running server and migrated database"]
async fn test_confirm_requires_both_parameters() {
    let client = client();

    let resp = client
        .get(format!("{}/api/accounts/confirmemail?email=&token=", base_url()))
        .send()
        .await
        .expect("Failed to send confirm request");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.expect("json body");
    assert_eq!(body["message"], "Email and Token are required.");
}

#[tokio::test]
#[ignore = "Requires a running server and migrated database"]
async fn test_confirmation_token_is_single_use() {
    let client = client();
    let email = unique_email("single-use");

    assert_eq!(register(&client, &email, "single").await.status(), StatusCode::OK);

    let token = mint_token(&email, TokenPurpose::EmailConfirmation).await;

    let first = confirm(&client, &email, &token).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = confirm(&client, &email, &token).await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
#[ignore = "Requires a running server and migrated database"]
async fn test_unknown_email_and_wrong_password_are_indistinguishable() {
    let client = client();
    let email = unique_email("enum");

    assert_eq!(register(&client, &email, "enum").await.status(), StatusCode::OK);
    let token = mint_token(&email, TokenPurpose::EmailConfirmation).await;
    assert_eq!(confirm(&client, &email, &token).await.status(), StatusCode::OK);

    let unknown = login(&client, &unique_email("ghost"), GOOD_PASSWORD).await;
    let wrong = login(&client, &email, "Wr0ng!password").await;

    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let unknown_body: Value = unknown.json().await.expect("json body");
    let wrong_body: Value = wrong.json().await.expect("json body");
    assert_eq!(unknown_body["message"], wrong_body["message"]);
}

#[tokio::test]
#[ignore = "Requires a running server and migrated database"]
async fn test_lockout_after_repeated_failures() {
    let client = client();
    let email = unique_email("lockout");

    assert_eq!(register(&client, &email, "lockout").await.status(), StatusCode::OK);
    let token = mint_token(&email, TokenPurpose::EmailConfirmation).await;
    assert_eq!(confirm(&client, &email, &token).await.status(), StatusCode::OK);

    // Four failures report invalid credentials; the fifth locks
    for _ in 0..4 {
        let resp = login(&client, &email, "Wr0ng!password").await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
    let fifth = login(&client, &email, "Wr0ng!password").await;
    assert_eq!(fifth.status(), StatusCode::BAD_REQUEST);

    // Even the correct password is refused while locked
    let locked = login(&client, &email, GOOD_PASSWORD).await;
    assert_eq!(locked.status(), StatusCode::BAD_REQUEST);
    let body: Value = locked.json().await.expect("json body");
    assert_eq!(
        body["message"],
        "Account locked out due to multiple failed login attempts."
    );
}

// ============================================================================
// Forgot / reset password
// ============================================================================

#[tokio::test]
#[ignore = "Requires a running server and migrated database"]
async fn test_forgot_password_messages_do_not_enumerate() {
    let client = client();

    // Registered but unconfirmed
    let unconfirmed = unique_email("unconfirmed");
    assert_eq!(
        register(&client, &unconfirmed, "unconfirmed").await.status(),
        StatusCode::OK
    );

    let forgot = |email: String| {
        let client = client.clone();
        async move {
            client
                .post(format!("{}/api/accounts/forgotpassword", base_url()))
                .json(&json!({ "email": email }))
                .send()
                .await
                .expect("Failed to send forgot request")
        }
    };

    let unknown = forgot(unique_email("ghost")).await;
    let not_confirmed = forgot(unconfirmed).await;

    assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
    assert_eq!(not_confirmed.status(), StatusCode::BAD_REQUEST);

    let unknown_body: Value = unknown.json().await.expect("json body");
    let not_confirmed_body: Value = not_confirmed.json().await.expect("json body");
    assert_eq!(unknown_body["message"], not_confirmed_body["message"]);
}

#[tokio::test]
#[ignore = "Requires a running server and migrated database"]
async fn test_reset_flow_replaces_password_once() {
    let client = client();
    let email = unique_email("reset");

    assert_eq!(register(&client, &email, "reset").await.status(), StatusCode::OK);
    let token = mint_token(&email, TokenPurpose::EmailConfirmation).await;
    assert_eq!(confirm(&client, &email, &token).await.status(), StatusCode::OK);

    let reset_token = mint_token(&email, TokenPurpose::PasswordReset).await;
    let new_password = "N3w!password";

    let resp = client
        .post(format!("{}/api/accounts/resetpassword", base_url()))
        .json(&json!({ "email": email, "token": reset_token, "password": new_password }))
        .send()
        .await
        .expect("Failed to send reset request");
    assert_eq!(resp.status(), StatusCode::OK);

    // Old password rejected, new one accepted
    assert_eq!(
        login(&client, &email, GOOD_PASSWORD).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        login(&client, &email, new_password).await.status(),
        StatusCode::OK
    );

    // The reset token is single-use
    let again = client
        .post(format!("{}/api/accounts/resetpassword", base_url()))
        .json(&json!({ "email": email, "token": reset_token, "password": "An0ther!pass" }))
        .send()
        .await
        .expect("Failed to send reset request");
    assert_eq!(again.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
#[ignore = "Requires a running server and migrated database"]
async fn test_register_confirm_login_end_to_end() {
    let client = client();
    let email = unique_email("alice-e2e");

    let resp = register(&client, &email, "alice").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let token = mint_token(&email, TokenPurpose::EmailConfirmation).await;
    let resp = confirm(&client, &email, &token).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("json body");
    assert_eq!(body["message"], "Email confirmed successfully!");

    let resp = login(&client, &email, GOOD_PASSWORD).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.expect("json body");
    assert_eq!(body["message"], "Login successful.");
    assert_eq!(body["userEmail"], email);
    assert_eq!(body["role"], "user");

    // The session established by login backs the profile endpoint
    let me = client
        .get(format!("{}/api/accounts/me", base_url()))
        .send()
        .await
        .expect("Failed to send profile request");
    assert_eq!(me.status(), StatusCode::OK);
    let body: Value = me.json().await.expect("json body");
    assert_eq!(body["userEmail"], email);
}
