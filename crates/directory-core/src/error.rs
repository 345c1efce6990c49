//! Error types for the supplier directory.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Result type alias using `DirectoryError`.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Main error type for domain operations.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Entity lookup failed.
    #[error("{entity} with id '{id}' not found")]
    NotFound {
        /// Entity kind, e.g. `Supplier`.
        entity: &'static str,
        /// The requested id.
        id: String,
    },

    /// Write would break a uniqueness rule.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Field validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Credentials missing or wrong.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Credential cipher failure.
    #[error("cryptography error: {0}")]
    Crypto(String),

    /// Backend failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DirectoryError {
    /// Builds a not-found error for an entity id.
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Authentication(_) => "UNAUTHORIZED",
            Self::Crypto(_) => "CRYPTO_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Conflict(_) => 409,
            Self::Validation(_) => 400,
            Self::Authentication(_) => 401,
            Self::Crypto(_) | Self::Storage(_) | Self::Internal(_) => 500,
        }
    }
}

/// Per-field validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Error)]
pub struct ValidationError {
    /// Field name to messages.
    pub fields: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    /// Creates an empty error set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an error set with a single message.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Adds a message for a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns true if the field has at least one message.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Converts into a `Result`, failing when any message was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .flat_map(|(field, msgs)| msgs.iter().map(move |m| format!("{field}: {m}")))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}
