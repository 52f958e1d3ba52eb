//! Account route handlers.
//!
//! JSON endpoints over the account orchestrator. Login establishes the
//! server-side session; the response still echoes the profile fields the
//! SPA displays.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use greengrocer_core::{AccountId, Role};

use crate::error::Result;
use crate::middleware::{RequireAuth, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::AccountsService;
use crate::services::accounts::MSG_LOGIN_SUCCESS;
use crate::state::AppState;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Optional role name; unknown names are a validation error.
    #[serde(default)]
    pub role: Option<String>,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Forgot-password request body.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Reset-password request body.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub token: String,
    pub password: String,
}

/// Query parameters of the confirmation link.
#[derive(Debug, Deserialize)]
pub struct ConfirmEmailQuery {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub email: String,
}

/// Generic message response.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Successful login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    #[serde(rename = "userEmail")]
    pub user_email: String,
    #[serde(rename = "userID")]
    pub user_id: AccountId,
    pub role: Role,
}

/// Session profile response.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(rename = "userEmail")]
    pub user_email: String,
    #[serde(rename = "userID")]
    pub user_id: AccountId,
    pub role: Role,
}

// =============================================================================
// Handlers
// =============================================================================

/// Register a new account.
///
/// POST /api/accounts/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>> {
    let service = AccountsService::new(state.pool(), state.email(), state.config());

    let message = service
        .register(&req.username, &req.email, &req.password, req.role.as_deref())
        .await?;

    Ok(Json(MessageResponse::new(message)))
}

/// Confirm an email address from the confirmation link.
///
/// GET /api/accounts/confirmemail?token=&email=
pub async fn confirm_email(
    State(state): State<AppState>,
    Query(query): Query<ConfirmEmailQuery>,
) -> Result<Json<MessageResponse>> {
    let service = AccountsService::new(state.pool(), state.email(), state.config());

    let message = service.confirm_email(&query.token, &query.email).await?;

    Ok(Json(MessageResponse::new(message)))
}

/// Verify credentials and establish the session.
///
/// POST /api/accounts/login
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let service = AccountsService::new(state.pool(), state.email(), state.config());

    let account = service.login(&req.email, &req.password).await?;

    let current_user = CurrentUser::from(&account);
    set_current_user(&session, &current_user).await?;

    Ok(Json(LoginResponse {
        message: MSG_LOGIN_SUCCESS.to_owned(),
        user_email: account.email.into_inner(),
        user_id: account.id,
        role: account.role,
    }))
}

/// Clear the session user.
///
/// POST /api/accounts/logout
pub async fn logout(session: Session) -> Result<Json<MessageResponse>> {
    clear_current_user(&session).await?;
    Ok(Json(MessageResponse::new("Logged out.")))
}

/// Return the session profile, reloaded from the identity store so a role
/// change since login takes effect.
///
/// GET /api/accounts/me
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ProfileResponse>> {
    let service = AccountsService::new(state.pool(), state.email(), state.config());

    let account = service.profile(user.id).await?;

    Ok(Json(ProfileResponse {
        user_email: account.email.into_inner(),
        user_id: account.id,
        role: account.role,
    }))
}

/// Dispatch a password-reset mail.
///
/// POST /api/accounts/forgotpassword
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let service = AccountsService::new(state.pool(), state.email(), state.config());

    let message = service.forgot_password(&req.email).await?;

    Ok(Json(MessageResponse::new(message)))
}

/// Replace a password using a token from the reset link.
///
/// POST /api/accounts/resetpassword
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>> {
    let service = AccountsService::new(state.pool(), state.email(), state.config());

    let message = service
        .reset_password(&req.email, &req.token, &req.password)
        .await?;

    Ok(Json(MessageResponse::new(message)))
}
