//! Standardized API error responses for all guildkey endpoints.
//!
//! # Response Format
//!
//! ```json
//! {
//!   "status": "error",
//!   "message": "this license key is already in use on another server",
//!   "code": "SERVER_MISMATCH"
//! }
//! ```
//!
//! `status` and `message` are what the bot integration reads; `code` is a
//! stable machine-readable discriminator.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::LicenseError;
use crate::server::validation::ValidationError;

/// Machine-readable error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request payload is missing a field or is malformed
    BadRequest,
    /// Presented key does not exist
    InvalidKey,
    /// Key exists but has been disabled
    KeyDeactivated,
    /// Key is bound to a different server
    ServerMismatch,
    /// Requested resource was not found
    NotFound,
    /// Operation conflicts with current state
    Conflict,
    /// Store could not be reached
    Unavailable,
    /// Server configuration error
    ConfigError,
    /// Unexpected internal server error
    InternalError,
}

impl ErrorCode {
    /// Returns the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,

            ErrorCode::InvalidKey | ErrorCode::KeyDeactivated | ErrorCode::ServerMismatch => {
                StatusCode::FORBIDDEN
            }

            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,

            ErrorCode::ConfigError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Standardized API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Always `"error"`
    pub status: String,
    /// Human-readable error message
    pub message: String,
    /// Machine-readable error code
    pub code: ErrorCode,
}

impl ApiError {
    /// Creates a new API error with a custom message.
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            code,
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<LicenseError> for ApiError {
    fn from(err: LicenseError) -> Self {
        let message = err.to_string();
        let code = match err {
            LicenseError::BadRequest(_) => ErrorCode::BadRequest,
            LicenseError::InvalidKey => ErrorCode::InvalidKey,
            LicenseError::KeyDeactivated => ErrorCode::KeyDeactivated,
            LicenseError::ServerMismatch => ErrorCode::ServerMismatch,
            LicenseError::NotFound(_) => ErrorCode::NotFound,
            LicenseError::Conflict(_) => ErrorCode::Conflict,
            // Store details stay in the server log.
            LicenseError::Unavailable(_) => {
                return ApiError::with_message(
                    ErrorCode::Unavailable,
                    "License store is temporarily unavailable",
                )
            }
            LicenseError::ConfigError(_) => ErrorCode::ConfigError,
            LicenseError::ServerError(_) => ErrorCode::InternalError,
        };
        ApiError::with_message(code, message)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        LicenseError::from(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::with_message(
            ErrorCode::BadRequest,
            format!("invalid JSON body: {}", rejection.body_text()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_status_mapping() {
        assert_eq!(ErrorCode::BadRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::InvalidKey.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::KeyDeactivated.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::ServerMismatch.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::Unavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn api_error_serialization() {
        let err: ApiError = LicenseError::ServerMismatch.into();
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["code"], "SERVER_MISMATCH");
        assert!(json["message"].as_str().unwrap().contains("another server"));
    }

    #[test]
    fn unavailable_hides_store_details() {
        let err: ApiError =
            LicenseError::Unavailable("database error: disk I/O error".to_string()).into();
        assert_eq!(err.code, ErrorCode::Unavailable);
        assert!(!err.message.contains("disk"));
    }

    #[test]
    fn conflict_keeps_reason() {
        let err: ApiError = LicenseError::Conflict("key is active".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.message, "conflict: key is active");
    }
}
