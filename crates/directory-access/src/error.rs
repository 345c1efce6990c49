//! Access control error types.

use thiserror::Error;

/// Access control result type.
pub type AccessResult<T> = Result<T, AccessError>;

/// Access control errors.
#[derive(Error, Debug)]
pub enum AccessError {
    /// Unauthorized (not authenticated).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (authenticated but not allowed).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Invalid token.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token expired.
    #[error("Token expired")]
    TokenExpired,

    /// Refresh token was blacklisted.
    #[error("Token is blacklisted")]
    TokenBlacklisted,

    /// Session unknown.
    #[error("Session not found")]
    SessionNotFound,

    /// Session past its lifetime or idle limit.
    #[error("Session expired")]
    SessionExpired,

    /// CSRF check failed.
    #[error("CSRF Failed: {0}")]
    Csrf(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AccessError {
    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::InvalidToken(_) => "INVALID_TOKEN",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::TokenBlacklisted => "TOKEN_BLACKLISTED",
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::Csrf(_) => "CSRF_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Forbidden(_) | Self::Csrf(_) => 403,
            Self::Unauthorized(_)
            | Self::InvalidToken(_)
            | Self::TokenExpired
            | Self::TokenBlacklisted
            | Self::SessionNotFound
            | Self::SessionExpired => 401,
            Self::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AccessError::TokenBlacklisted.http_status(), 401);
        assert_eq!(AccessError::Csrf("CSRF cookie not set.".into()).http_status(), 403);
        assert_eq!(AccessError::Csrf("x".into()).code(), "CSRF_FAILED");
    }
}
