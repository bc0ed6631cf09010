use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::auth::registration::AuthError;
use crate::auth::token::TokenError;
use crate::enrollment::EnrollmentError;
use crate::gateway::GatewayError;
use crate::store::StoreError;
use crate::users::SyncError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Every response body is `{"success": false, "kind", "message"}`. Store,
/// token-encoding and provider details are logged, never returned.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

const INTERNAL_MESSAGE: &str = "An internal server error occurred.";

fn internal(detail: &dyn std::fmt::Display) -> (StatusCode, &'static str, String) {
    tracing::error!("Internal error: {detail}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal",
        INTERNAL_MESSAGE.to_string(),
    )
}

impl AppError {
    /// Status, stable kind tag and user-safe message.
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "Validation", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NotFound", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
                "Authentication required.".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "Forbidden",
                "You do not have access to this resource.".to_string(),
            ),

            AppError::Token(TokenError::Decode(_)) => (
                StatusCode::UNAUTHORIZED,
                "DecodeError",
                "Your session is invalid. Please log in again.".to_string(),
            ),
            AppError::Token(TokenError::Expired) => (
                StatusCode::UNAUTHORIZED,
                "TokenExpired",
                "Your session has expired. Please log in again.".to_string(),
            ),
            AppError::Token(e @ TokenError::Encode(_)) => internal(e),

            AppError::Auth(e) => match e {
                AuthError::DuplicateAccount => (
                    StatusCode::CONFLICT,
                    "DuplicateAccount",
                    "An account with this email already exists.".to_string(),
                ),
                AuthError::NoPendingRequest => (
                    StatusCode::NOT_FOUND,
                    "NoPendingRequest",
                    "No verification request found. Please register again.".to_string(),
                ),
                AuthError::Expired => (
                    StatusCode::GONE,
                    "Expired",
                    "Your verification code has expired. Please request a new code.".to_string(),
                ),
                AuthError::InvalidCode => (
                    StatusCode::BAD_REQUEST,
                    "InvalidCode",
                    "Invalid verification code.".to_string(),
                ),
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "InvalidCredentials",
                    "Invalid email or password.".to_string(),
                ),
                AuthError::NotVerified => (
                    StatusCode::FORBIDDEN,
                    "NotVerified",
                    "Your account is not verified.".to_string(),
                ),
                AuthError::Store(_) | AuthError::Token(_) | AuthError::Hash(_) => internal(e),
            },

            AppError::Gateway(e) => match e {
                GatewayError::SchemaViolation(detail) => {
                    tracing::warn!("Model output rejected: {detail}");
                    (
                        StatusCode::BAD_GATEWAY,
                        "SchemaViolation",
                        "The AI returned an unexpected response. Please try again.".to_string(),
                    )
                }
                GatewayError::UnparsableEmbeddedJson(detail) => {
                    tracing::warn!("Model output rejected: {detail}");
                    (
                        StatusCode::BAD_GATEWAY,
                        "UnparsableEmbeddedJson",
                        "The AI response could not be read. Please try again.".to_string(),
                    )
                }
                // Already logged with provider detail by the gateway.
                GatewayError::Unavailable(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "GatewayUnavailable",
                    "The AI service is currently unavailable. Please try again later.".to_string(),
                ),
            },

            AppError::Enrollment(e) => match e {
                EnrollmentError::UnknownUser => (
                    StatusCode::NOT_FOUND,
                    "UnknownUser",
                    "User not found.".to_string(),
                ),
                EnrollmentError::UnknownCourse => (
                    StatusCode::NOT_FOUND,
                    "UnknownCourse",
                    "Course not found.".to_string(),
                ),
                EnrollmentError::Store(inner) => internal(inner),
            },

            AppError::Sync(e) => match e {
                SyncError::UnknownUser => (
                    StatusCode::NOT_FOUND,
                    "UnknownUser",
                    "User not found.".to_string(),
                ),
                SyncError::UnknownAccount(_) => (
                    StatusCode::NOT_FOUND,
                    "UnknownAccount",
                    "No linked account for this platform.".to_string(),
                ),
                SyncError::Store(inner) => internal(inner),
            },

            AppError::Store(e) => internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = self.parts();
        let body = Json(json!({
            "success": false,
            "kind": kind,
            "message": message,
        }));
        (status, body).into_response()
    }
}

// Extractor rejections carry parser detail; callers only see a fixed message.

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {rejection}");
        let message = match rejection {
            JsonRejection::JsonDataError(_) => "Request body has missing or invalid fields.",
            JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON.",
            JsonRejection::MissingJsonContentType(_) => {
                "Request body must be sent as application/json."
            }
            _ => "Request body could not be read.",
        };
        AppError::Validation(message.to_string())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!("Rejected query string: {rejection}");
        AppError::Validation("Query string has invalid parameters.".to_string())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("Rejected path: {rejection}");
        AppError::Validation("Path has an invalid segment.".to_string())
    }
}

/// Rejects empty or whitespace-only input before any downstream work.
pub fn require_non_blank(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        Err(AppError::Validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}
