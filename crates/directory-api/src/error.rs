//! API error types.

use crate::middleware::logging::current_request_id;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use directory_access::AccessError;
use directory_core::{DirectoryError, ValidationError};
use directory_crypto::CryptoError;
use directory_storage::StorageError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::error;

/// API result type.
pub type ApiResult<T> = Result<T, ApiError>;

/// API error.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad request (400).
    #[error("{0}")]
    BadRequest(String),

    /// Field validation failed (400).
    #[error("Validation error")]
    Validation(ValidationError),

    /// Not authenticated (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed (403).
    #[error("{0}")]
    Forbidden(String),

    /// Not found (404).
    #[error("{0}")]
    NotFound(String),

    /// Conflict (409).
    #[error("{0}")]
    Conflict(String),

    /// Internal server error (500).
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Service unavailable (503).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    /// The response for a request with no usable credentials.
    #[must_use]
    pub fn not_authenticated() -> Self {
        Self::Unauthorized("Authentication credentials were not provided.".to_string())
    }

    /// The response for a caller lacking permission.
    #[must_use]
    pub fn permission_denied() -> Self {
        Self::Forbidden("You do not have permission to perform this action.".to_string())
    }

    /// Returns the HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns the error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Per-field messages for validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
    /// Request ID for tracing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Timestamp.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let (message, errors) = match self {
            Self::Validation(v) => (v.to_string(), Some(v.fields)),
            other => (other.to_string(), None),
        };

        let body = ErrorResponse {
            code,
            message,
            errors,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<DirectoryError> for ApiError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::NotFound { .. } => Self::NotFound(e.to_string()),
            DirectoryError::Conflict(msg) => Self::Conflict(msg),
            DirectoryError::Validation(v) => Self::Validation(v),
            DirectoryError::Authentication(msg) => Self::Unauthorized(msg),
            DirectoryError::Crypto(_) | DirectoryError::Storage(_) | DirectoryError::Internal(_) => {
                Self::Internal(e.to_string())
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        DirectoryError::from(e).into()
    }
}

impl From<CryptoError> for ApiError {
    fn from(e: CryptoError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<AccessError> for ApiError {
    fn from(e: AccessError) -> Self {
        match e {
            AccessError::Forbidden(msg) => Self::Forbidden(msg),
            AccessError::Csrf(_) => Self::Forbidden(e.to_string()),
            AccessError::TokenExpired | AccessError::TokenBlacklisted | AccessError::InvalidToken(_) => {
                Self::Unauthorized(format!("Token is invalid or expired: {e}"))
            }
            AccessError::Unauthorized(msg) => Self::Unauthorized(msg),
            AccessError::SessionNotFound | AccessError::SessionExpired => Self::not_authenticated(),
            AccessError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        let mut errors = ValidationError::new();
        for (field, field_errors) in e.field_errors() {
            for error in field_errors {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Validation failed: {}", error.code));
                errors.add(field.to_string(), message);
            }
        }
        Self::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(ApiError::BadRequest("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_authenticated().status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::permission_denied().status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("x".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Internal("x".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_storage_errors_map_to_statuses() {
        let err: ApiError = StorageError::not_found("Vendor", 9).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("Vendor"));

        let err: ApiError = StorageError::missing_pk("supplier_ids", 3).into();
        match err {
            ApiError::Validation(v) => assert!(v.has("supplier_ids")),
            other => panic!("unexpected {other:?}"),
        }

        let err: ApiError = StorageError::Conflict("dup".into()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_access_errors_map_to_statuses() {
        let err: ApiError = AccessError::Csrf("CSRF token missing.".into()).into();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "CSRF Failed: CSRF token missing.");

        let err: ApiError = AccessError::TokenBlacklisted.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_error_body_carries_field_errors() {
        let err = ApiError::Validation(ValidationError::field("name", "This field may not be blank."));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
