//! Cookie rendering and parsing.

use std::fmt;

/// SameSite policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    /// `SameSite=Strict`.
    Strict,
    /// `SameSite=Lax`.
    Lax,
    /// `SameSite=None`.
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        })
    }
}

/// Attributes of a cookie the server sets.
#[derive(Debug, Clone)]
pub struct CookieSpec {
    /// Cookie name.
    pub name: String,
    /// Cookie path.
    pub path: String,
    /// Lifetime in seconds; `None` makes a browser-session cookie.
    pub max_age: Option<u64>,
    /// SameSite policy.
    pub same_site: SameSite,
    /// Hidden from scripts.
    pub http_only: bool,
    /// Only sent over HTTPS.
    pub secure: bool,
}

impl CookieSpec {
    /// A `Path=/`, `SameSite=Lax` cookie.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: "/".to_string(),
            max_age: None,
            same_site: SameSite::Lax,
            http_only: false,
            secure: false,
        }
    }

    /// Sets the lifetime.
    #[must_use]
    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Sets `HttpOnly`.
    #[must_use]
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Sets `Secure`.
    #[must_use]
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets the SameSite policy.
    #[must_use]
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    /// Formats the `Set-Cookie` header value.
    #[must_use]
    pub fn to_header(&self, value: &str) -> String {
        let mut parts = vec![format!("{}={}", self.name, value), format!("Path={}", self.path)];

        if let Some(max_age) = self.max_age {
            parts.push(format!("Max-Age={max_age}"));
        }
        parts.push(format!("SameSite={}", self.same_site));

        if self.http_only {
            parts.push("HttpOnly".to_string());
        }

        if self.secure {
            parts.push("Secure".to_string());
        }

        parts.join("; ")
    }

    /// Formats a header that deletes the cookie.
    #[must_use]
    pub fn removal_header(&self) -> String {
        format!(
            "{}=\"\"; Path={}; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; SameSite={}",
            self.name, self.path, self.same_site
        )
    }
}

/// Finds a cookie value in a `Cookie` request header.
#[must_use]
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim().trim_matches('"'))
    })
}
