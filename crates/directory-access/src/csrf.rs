//! Double-submit CSRF protection.
//!
//! The server hands out a random token in the `csrftoken` cookie; unsafe
//! session-authenticated requests must echo it in the `X-CSRFToken` header.

use crate::{AccessError, AccessResult, CookieSpec};
use directory_crypto::{constant_time_eq, random_hex};

/// Hex characters in a token.
pub const TOKEN_LEN: usize = 64;

/// Issues and checks CSRF tokens.
#[derive(Debug, Clone)]
pub struct CsrfGuard {
    cookie: CookieSpec,
    header_name: String,
}

impl Default for CsrfGuard {
    fn default() -> Self {
        Self {
            cookie: CookieSpec::new("csrftoken").max_age(31_449_600),
            header_name: "x-csrftoken".to_string(),
        }
    }
}

impl CsrfGuard {
    /// Creates a guard with a `Secure` flag matching the deployment.
    #[must_use]
    pub fn new(secure: bool) -> Self {
        let mut guard = Self::default();
        guard.cookie = guard.cookie.secure(secure);
        guard
    }

    /// Generates a fresh token.
    #[must_use]
    pub fn issue(&self) -> String {
        random_hex(TOKEN_LEN / 2)
    }

    /// Cookie carrying the token.
    #[must_use]
    pub fn cookie(&self) -> &CookieSpec {
        &self.cookie
    }

    /// Request header echoing the token, lowercase.
    #[must_use]
    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    /// Checks the cookie/header pair.
    pub fn verify(&self, cookie: Option<&str>, header: Option<&str>) -> AccessResult<()> {
        let cookie = cookie.ok_or_else(|| AccessError::Csrf("CSRF cookie not set.".to_string()))?;
        check_format(cookie).map_err(|reason| AccessError::Csrf(format!("CSRF cookie {reason}.")))?;

        let header = header.ok_or_else(|| AccessError::Csrf("CSRF token missing.".to_string()))?;
        check_format(header).map_err(|reason| AccessError::Csrf(format!("CSRF token {reason}.")))?;

        if !constant_time_eq(cookie.as_bytes(), header.as_bytes()) {
            return Err(AccessError::Csrf("CSRF token incorrect.".to_string()));
        }
        Ok(())
    }
}

fn check_format(token: &str) -> Result<(), &'static str> {
    if token.len() != TOKEN_LEN {
        return Err("has incorrect length");
    }
    if !token.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err("has invalid characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_format() {
        let guard = CsrfGuard::default();
        let token = guard.issue();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(check_format(&token).is_ok());
        assert_ne!(token, guard.issue());
    }

    #[test]
    fn test_verify_matching_pair() {
        let guard = CsrfGuard::default();
        let token = guard.issue();
        assert!(guard.verify(Some(&token), Some(&token)).is_ok());
    }

    #[test]
    fn test_verify_failures() {
        let guard = CsrfGuard::default();
        let token = guard.issue();
        let other = guard.issue();

        let err = guard.verify(None, Some(&token)).unwrap_err();
        assert_eq!(err.to_string(), "CSRF Failed: CSRF cookie not set.");

        let err = guard.verify(Some(&token), None).unwrap_err();
        assert!(err.to_string().contains("CSRF token missing."));

        let err = guard.verify(Some(&token), Some(&other)).unwrap_err();
        assert!(err.to_string().contains("incorrect"));

        let err = guard.verify(Some(&token), Some("short")).unwrap_err();
        assert!(err.to_string().contains("incorrect length"));

        let bad = "z".repeat(TOKEN_LEN);
        assert!(guard.verify(Some(&bad), Some(&bad)).is_err());
    }

    #[test]
    fn test_secure_flag() {
        assert!(CsrfGuard::new(true).cookie().secure);
        assert!(!CsrfGuard::new(false).cookie().http_only);
    }
}
