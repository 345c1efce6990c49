//! Application state.

use directory_access::{CookieSpec, CsrfGuard, SameSite, SessionManager, TokenManager};
use directory_crypto::CredentialCipher;
use directory_storage::DirectoryStore;
use std::sync::Arc;

/// Name of the cookie carrying the JWT access token.
pub const ACCESS_COOKIE: &str = "access_token";
/// Name of the cookie carrying the JWT refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Persistence.
    pub store: Arc<dyn DirectoryStore>,
    /// Supplier password cipher.
    pub cipher: CredentialCipher,
    /// JWT issuance and blacklist.
    pub tokens: Arc<TokenManager>,
    /// Server-side sessions.
    pub sessions: Arc<SessionManager>,
    /// CSRF tokens.
    pub csrf: CsrfGuard,
    /// Application configuration.
    pub config: AppConfig,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Service name.
    pub service_name: String,
    /// Debug mode; auth cookies drop `Secure`.
    pub debug: bool,
    /// Max request body size.
    pub max_body_size: usize,
    /// CORS allowed origins; empty allows any origin without credentials.
    pub cors_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "supplier-directory".to_string(),
            debug: false,
            max_body_size: 2 * 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

impl AppState {
    /// Creates a new application state builder.
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    /// Spec for a JWT cookie: `HttpOnly`, `SameSite=Lax`, `Secure` unless
    /// debugging.
    #[must_use]
    pub fn token_cookie(&self, name: &str) -> CookieSpec {
        CookieSpec::new(name)
            .http_only(true)
            .secure(!self.config.debug)
            .same_site(SameSite::Lax)
    }
}

/// Builder for AppState.
pub struct AppStateBuilder {
    store: Option<Arc<dyn DirectoryStore>>,
    cipher: Option<CredentialCipher>,
    tokens: Option<Arc<TokenManager>>,
    sessions: Option<Arc<SessionManager>>,
    csrf: Option<CsrfGuard>,
    config: AppConfig,
}

impl AppStateBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            store: None,
            cipher: None,
            tokens: None,
            sessions: None,
            csrf: None,
            config: AppConfig::default(),
        }
    }

    /// Sets the store.
    pub fn store(mut self, store: Arc<dyn DirectoryStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the cipher.
    pub fn cipher(mut self, cipher: CredentialCipher) -> Self {
        self.cipher = Some(cipher);
        self
    }

    /// Sets the token manager.
    pub fn tokens(mut self, tokens: Arc<TokenManager>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Sets the session manager.
    pub fn sessions(mut self, sessions: Arc<SessionManager>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Sets the CSRF guard.
    pub fn csrf(mut self, csrf: CsrfGuard) -> Self {
        self.csrf = Some(csrf);
        self
    }

    /// Sets the configuration.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the AppState.
    pub fn build(self) -> Result<AppState, &'static str> {
        let debug = self.config.debug;
        Ok(AppState {
            store: self.store.ok_or("store is required")?,
            cipher: self.cipher.ok_or("cipher is required")?,
            tokens: self.tokens.ok_or("tokens is required")?,
            sessions: self.sessions.ok_or("sessions is required")?,
            csrf: self.csrf.unwrap_or_else(|| CsrfGuard::new(!debug)),
            config: self.config,
        })
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
