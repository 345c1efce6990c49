//! Password key tooling.

use clap::Args;
use directory_core::EncryptedSecret;
use directory_crypto::{CredentialCipher, EncryptionKey};

use crate::output::{success, CliError, ErrorKind};

/// Decrypt a stored website password.
#[derive(Args)]
pub struct DecryptPasswordCommand {
    /// Token as stored in the database
    pub encrypted_password: String,

    /// Base64 password encryption key
    #[arg(long, env = "DIRECTORY__PASSWORD_ENCRYPTION_KEY", hide_env_values = true)]
    pub key: String,
}

impl DecryptPasswordCommand {
    /// Prints the plaintext.
    pub fn run(self) -> Result<(), CliError> {
        let plain = decrypt(&self.key, &self.encrypted_password)?;
        success(&format!("Decrypted password: {plain}"));
        Ok(())
    }
}

/// Encrypt a website password.
#[derive(Args)]
pub struct EncryptPasswordCommand {
    /// Plaintext password
    pub password: String,

    /// Base64 password encryption key
    #[arg(long, env = "DIRECTORY__PASSWORD_ENCRYPTION_KEY", hide_env_values = true)]
    pub key: String,
}

impl EncryptPasswordCommand {
    /// Prints the token.
    pub fn run(self) -> Result<(), CliError> {
        let token = cipher(&self.key)?.encrypt(&self.password)?;
        println!("{}", token.as_token());
        Ok(())
    }
}

/// Prints a new random key in the format the server expects.
pub fn generate_key() -> Result<(), CliError> {
    println!("{}", EncryptionKey::generate().to_base64());
    Ok(())
}

fn cipher(key: &str) -> Result<CredentialCipher, CliError> {
    let key = EncryptionKey::from_base64(key)?;
    Ok(CredentialCipher::new(&key)?)
}

fn decrypt(key: &str, token: &str) -> Result<String, CliError> {
    cipher(key)?
        .decrypt(&EncryptedSecret::from_token(token.trim()))
        .map_err(|e| CliError::with_cause(ErrorKind::Crypto, "Could not decrypt password", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decrypt_what_encrypt_printed() {
        let key = EncryptionKey::generate().to_base64();
        let token = cipher(&key).unwrap().encrypt("hunter2").unwrap();

        assert_eq!(decrypt(&key, token.as_token()).unwrap(), "hunter2");
    }

    #[test]
    fn test_wrong_key_fails() {
        let token = cipher(&EncryptionKey::generate().to_base64())
            .unwrap()
            .encrypt("hunter2")
            .unwrap();

        let err = decrypt(&EncryptionKey::generate().to_base64(), token.as_token()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Crypto);
        assert_eq!(err.message, "Could not decrypt password");
    }

    #[test]
    fn test_bad_key_is_rejected() {
        assert!(cipher("not a key").is_err());
    }
}
