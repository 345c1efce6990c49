//! # Directory Crypto
//!
//! Cryptographic services for the supplier directory:
//! - AES-256-GCM credential cipher for supplier website passwords
//! - Zeroizing key material
//! - Argon2id password hashing for user accounts
//! - Random tokens and digests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod encryption;
pub mod key;
pub mod hash;
pub mod password;
pub mod error;

pub use encryption::*;
pub use key::*;
pub use hash::*;
pub use password::*;
pub use error::*;
