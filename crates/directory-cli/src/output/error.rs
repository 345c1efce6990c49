//! CLI error types and handling.

use std::process::ExitCode;

use colored::Colorize;
use directory_core::ValidationError;
use directory_crypto::CryptoError;
use directory_storage::StorageError;

/// CLI error type.
#[derive(Debug)]
pub struct CliError {
    /// Error kind.
    pub kind: ErrorKind,
    /// Error message.
    pub message: String,
    /// Underlying cause.
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or bad settings.
    Config,
    /// Database error.
    Storage,
    /// Rejected input.
    Validation,
    /// Key or token problem.
    Crypto,
    /// IO error.
    Io,
}

impl CliError {
    /// Creates a new CLI error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Creates a new CLI error with a cause.
    pub fn with_cause<E>(kind: ErrorKind, message: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            kind,
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Returns the exit code for this error.
    pub fn exit_code(&self) -> ExitCode {
        match self.kind {
            ErrorKind::Storage => ExitCode::from(1),
            ErrorKind::Config => ExitCode::from(2),
            ErrorKind::Crypto => ExitCode::from(3),
            ErrorKind::Validation => ExitCode::from(4),
            ErrorKind::Io => ExitCode::from(5),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref cause) = self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<StorageError> for CliError {
    fn from(error: StorageError) -> Self {
        let kind = match &error {
            StorageError::InvalidReference(_) | StorageError::Conflict(_) => ErrorKind::Validation,
            _ => ErrorKind::Storage,
        };
        Self::with_cause(kind, "Database error", error)
    }
}

impl From<CryptoError> for CliError {
    fn from(error: CryptoError) -> Self {
        Self::with_cause(ErrorKind::Crypto, "Encryption error", error)
    }
}

impl From<ValidationError> for CliError {
    fn from(error: ValidationError) -> Self {
        Self::new(ErrorKind::Validation, error.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(error: std::io::Error) -> Self {
        Self::with_cause(ErrorKind::Io, "IO error", error)
    }
}

impl From<csv::Error> for CliError {
    fn from(error: csv::Error) -> Self {
        Self::with_cause(ErrorKind::Io, "Could not read file", error)
    }
}

/// Prints an error to stderr.
pub fn print_error(error: &CliError) {
    let prefix = match error.kind {
        ErrorKind::Config => "Configuration error",
        ErrorKind::Storage => "Database error",
        ErrorKind::Validation => "Validation error",
        ErrorKind::Crypto => "Encryption error",
        ErrorKind::Io => "IO error",
    };

    eprintln!("{} {}", format!("{}:", prefix).red().bold(), error.message);

    if let Some(ref cause) = error.cause {
        eprintln!("  {}", format!("Caused by: {cause}").dimmed());
    }

    match error.kind {
        ErrorKind::Config => {
            eprintln!();
            eprintln!("{}", "Hint: Set the database URL with:".dimmed());
            eprintln!("{}", "  export DATABASE_URL=postgres://localhost/directory".dimmed());
        }
        ErrorKind::Crypto => {
            eprintln!();
            eprintln!("{}", "Hint: Pass the password key with --key or set:".dimmed());
            eprintln!("{}", "  export DIRECTORY__PASSWORD_ENCRYPTION_KEY=<base64 key>".dimmed());
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_map_to_kinds() {
        let err: CliError = StorageError::Conflict("username".into()).into();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err: CliError = StorageError::Backend("connection refused".into()).into();
        assert_eq!(err.kind, ErrorKind::Storage);
        assert_eq!(err.to_string(), "Database error: Backend error: connection refused");
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let err: CliError = ValidationError::field("name", "This field may not be blank.").into();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.message.contains("name: This field may not be blank."));
    }
}
