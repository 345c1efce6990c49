//! AES-256-GCM cipher for supplier website passwords.
//!
//! A token is the URL-safe base64 (unpadded) encoding of
//! `version || nonce || ciphertext+tag`. Every encryption draws a fresh
//! 96-bit nonce, so encrypting the same password twice yields different
//! tokens.

use crate::{CryptoError, CryptoResult, EncryptionKey};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use directory_core::EncryptedSecret;
use rand::RngCore;

/// Token format version byte.
pub const TOKEN_VERSION: u8 = 0x01;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const MIN_TOKEN_LEN: usize = 1 + NONCE_LEN + TAG_LEN;

/// Encrypts and decrypts supplier credentials under one key.
#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    /// Creates a cipher for `key`.
    pub fn new(key: &EncryptionKey) -> CryptoResult<Self> {
        let cipher = Aes256Gcm::new_from_slice(key.secure_bytes().as_slice())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Encrypts a plaintext password into a storable token.
    pub fn encrypt(&self, plaintext: &str) -> CryptoResult<EncryptedSecret> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::EncryptionFailed("AEAD encryption failed".to_string()))?;

        let mut raw = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        raw.push(TOKEN_VERSION);
        raw.extend_from_slice(&nonce_bytes);
        raw.extend_from_slice(&ciphertext);

        Ok(EncryptedSecret::from_token(URL_SAFE_NO_PAD.encode(raw)))
    }

    /// Decrypts a stored token.
    pub fn decrypt(&self, secret: &EncryptedSecret) -> CryptoResult<String> {
        let raw = split_token(secret.as_token())?;
        let nonce = Nonce::from_slice(&raw[1..=NONCE_LEN]);

        let plaintext = self
            .cipher
            .decrypt(nonce, &raw[1 + NONCE_LEN..])
            .map_err(|_| CryptoError::AuthenticationFailed)?;

        String::from_utf8(plaintext)
            .map_err(|_| CryptoError::DecryptionFailed("plaintext is not UTF-8".to_string()))
    }

    /// Returns true if `value` is shaped like a token of this format.
    ///
    /// This does not check the tag; a token made under another key still
    /// counts.
    #[must_use]
    pub fn is_token(value: &str) -> bool {
        split_token(value).is_ok()
    }
}

impl std::fmt::Debug for CredentialCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCipher").finish_non_exhaustive()
    }
}

fn split_token(token: &str) -> CryptoResult<Vec<u8>> {
    let raw = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|e| CryptoError::InvalidToken(e.to_string()))?;

    if raw.len() < MIN_TOKEN_LEN {
        return Err(CryptoError::InvalidToken(format!(
            "token too short: {} bytes",
            raw.len()
        )));
    }
    if raw[0] != TOKEN_VERSION {
        return Err(CryptoError::InvalidToken(format!(
            "unknown token version {:#04x}",
            raw[0]
        )));
    }
    Ok(raw)
}
