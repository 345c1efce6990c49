//! Storage error types.

use directory_core::{DirectoryError, ValidationError};
use thiserror::Error;

/// Storage result type.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Row not found.
    #[error("{entity} with id '{id}' not found")]
    NotFound {
        /// Entity kind.
        entity: &'static str,
        /// Requested id.
        id: String,
    },

    /// Uniqueness violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A write referenced rows that do not exist.
    #[error("Invalid reference: {0}")]
    InvalidReference(ValidationError),

    /// Backend error.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Schema migration failed.
    #[error("Migration error: {0}")]
    Migration(String),
}

impl StorageError {
    /// Builds a not-found error.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Builds the error for a missing primary key in a relation field.
    pub fn missing_pk(field: &str, id: impl std::fmt::Display) -> Self {
        Self::InvalidReference(ValidationError::field(
            field,
            format!("Invalid pk \"{id}\" - object does not exist."),
        ))
    }
}

impl From<StorageError> for DirectoryError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => Self::NotFound { entity, id },
            StorageError::Conflict(msg) => Self::Conflict(msg),
            StorageError::InvalidReference(errors) => Self::Validation(errors),
            StorageError::Backend(msg) | StorageError::Migration(msg) => Self::Storage(msg),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db) = err.as_database_error() {
            if db.code().as_deref() == Some("23505") {
                return Self::Conflict(db.message().to_string());
            }
        }
        Self::Backend(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::migrate::MigrateError> for StorageError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(err.to_string())
    }
}
