//! Secure key types with zeroization.

use crate::{CryptoError, CryptoResult};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use rand::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a credential key in bytes.
pub const KEY_LEN: usize = 32;

/// Secure bytes that are zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureBytes(Vec<u8>);

impl SecureBytes {
    /// Creates new secure bytes.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Returns the bytes as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecureBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureBytes([REDACTED, {} bytes])", self.0.len())
    }
}

impl AsRef<[u8]> for SecureBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The symmetric key protecting supplier website passwords.
///
/// Serialized as 32 bytes of URL-safe base64, the same shape as the keys
/// operators already keep in `PASSWORD_ENCRYPTION_KEY`.
#[derive(Clone)]
pub struct EncryptionKey(SecureBytes);

impl EncryptionKey {
    /// Parses a base64 key. URL-safe and standard alphabets are accepted,
    /// with or without padding.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(CryptoError::InvalidKey("key is empty".to_string()));
        }

        let bytes = [URL_SAFE, URL_SAFE_NO_PAD, STANDARD, STANDARD_NO_PAD]
            .iter()
            .find_map(|engine| engine.decode(encoded).ok())
            .ok_or_else(|| CryptoError::InvalidKey("key is not valid base64".to_string()))?;

        Self::from_bytes(bytes)
    }

    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> CryptoResult<Self> {
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::InvalidKey(format!(
                "Expected {KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(SecureBytes::new(bytes)))
    }

    /// Generates a new random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut key = vec![0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut key);
        Self(SecureBytes::new(key))
    }

    /// Encodes the key as padded URL-safe base64.
    #[must_use]
    pub fn to_base64(&self) -> String {
        URL_SAFE.encode(self.0.as_slice())
    }

    /// Raw key material.
    #[must_use]
    pub fn secure_bytes(&self) -> &SecureBytes {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EncryptionKey").field(&"[REDACTED]").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_bytes_debug() {
        let bytes = SecureBytes::new(vec![1, 2, 3]);
        let debug = format!("{bytes:?}");
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("1, 2, 3"));
    }

    #[test]
    fn test_key_base64_roundtrip() {
        let key = EncryptionKey::generate();
        let encoded = key.to_base64();
        assert_eq!(encoded.len(), 44);

        let parsed = EncryptionKey::from_base64(&encoded).unwrap();
        assert_eq!(parsed.secure_bytes().as_slice(), key.secure_bytes().as_slice());
    }

    #[test]
    fn test_key_accepts_standard_alphabet() {
        let raw = vec![0xfbu8; KEY_LEN];
        let standard = STANDARD.encode(&raw);
        assert!(standard.contains('+') || standard.contains('/'));
        let key = EncryptionKey::from_base64(&standard).unwrap();
        assert_eq!(key.secure_bytes().as_slice(), raw.as_slice());
    }

    #[test]
    fn test_key_rejects_bad_input() {
        assert!(EncryptionKey::from_base64("").is_err());
        assert!(EncryptionKey::from_base64("not base64 !!").is_err());
        assert!(EncryptionKey::from_base64(&URL_SAFE.encode([0u8; 16])).is_err());
    }

    #[test]
    fn test_key_debug_redacted() {
        let key = EncryptionKey::generate();
        assert!(!format!("{key:?}").contains(&key.to_base64()));
    }
}
