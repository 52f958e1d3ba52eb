//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type with one status code per failure
//! class. Server-side classes (database, session, internal) and feed
//! failures are captured to Sentry and logged with full detail; the client
//! body never carries internal detail. All route handlers return
//! `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::feed::FeedError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// External product feed operation failed.
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// Session store operation failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Request rejected by validation; carries every violated rule.
    #[error("Validation failed")]
    Validation(Vec<String>),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body for single-message error responses.
#[derive(Serialize)]
struct MessageBody {
    message: String,
}

/// JSON body for validation failures, mirroring the registration contract.
#[derive(Serialize)]
struct ErrorListBody {
    errors: Vec<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server-side errors to Sentry
        if matches!(
            self,
            Self::Database(_) | Self::Internal(_) | Self::Session(_) | Self::Feed(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Database(_) | Self::Internal(_) | Self::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Feed(_) => StatusCode::BAD_GATEWAY,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        };

        // Don't expose internal error details to clients
        match self {
            Self::Database(_) | Self::Internal(_) | Self::Session(_) => (
                status,
                Json(MessageBody {
                    message: "Internal server error".to_string(),
                }),
            )
                .into_response(),
            Self::Feed(_) => (
                status,
                Json(MessageBody {
                    message: "External service error".to_string(),
                }),
            )
                .into_response(),
            Self::Validation(errors) => (status, Json(ErrorListBody { errors })).into_response(),
            Self::NotFound(message) | Self::Unauthorized(message) | Self::BadRequest(message) => {
                (status, Json(MessageBody { message })).into_response()
            }
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Validation(vec!["weak password".to_string()])),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_dependency_failures_map_to_bad_gateway() {
        assert_eq!(
            get_status(AppError::Feed(FeedError::Data("bad row".to_string()))),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_internal_detail_is_not_leaked() {
        let response =
            AppError::Internal("connection string postgres://user:pw@db".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // Body is the generic message; the connection string stays server-side.
    }
}
