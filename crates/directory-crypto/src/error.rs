//! Cryptographic error types.

use thiserror::Error;

/// Cryptographic errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed.
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed.
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    /// Invalid key.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Token is not a credential token.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Authentication failed (AEAD tag mismatch).
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
}

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

impl From<aes_gcm::Error> for CryptoError {
    fn from(_: aes_gcm::Error) -> Self {
        Self::AuthenticationFailed
    }
}

impl From<CryptoError> for directory_core::DirectoryError {
    fn from(err: CryptoError) -> Self {
        Self::Crypto(err.to_string())
    }
}
