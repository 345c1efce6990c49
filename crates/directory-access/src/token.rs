//! JWT token management.

use crate::{AccessError, AccessResult};
use chrono::{Duration, Utc};
use directory_core::{User, UserId};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Token configuration.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Secret key for signing (HS256).
    pub secret: String,
    /// Token issuer.
    pub issuer: String,
    /// Token audience.
    pub audience: Option<String>,
    /// Access token expiration (seconds).
    pub access_token_ttl: i64,
    /// Refresh token expiration (seconds).
    pub refresh_token_ttl: i64,
    /// Issue a new refresh token on every refresh.
    pub rotate_refresh_tokens: bool,
    /// Blacklist the old refresh token when rotating.
    pub blacklist_after_rotation: bool,
    /// Algorithm to use.
    pub algorithm: Algorithm,
    /// Extra claims written into every access token.
    pub access_claims: HashMap<String, serde_json::Value>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            issuer: "supplier-directory".to_string(),
            audience: None,
            access_token_ttl: 300,    // 5 minutes
            refresh_token_ttl: 86400, // 1 day
            rotate_refresh_tokens: false,
            blacklist_after_rotation: true,
            algorithm: Algorithm::HS256,
            access_claims: HashMap::new(),
        }
    }
}

impl TokenConfig {
    /// Creates a new config with secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    /// Sets issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Sets audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = Some(audience.into());
        self
    }

    /// Sets access token TTL.
    #[must_use]
    pub fn with_access_ttl(mut self, seconds: i64) -> Self {
        self.access_token_ttl = seconds;
        self
    }

    /// Sets refresh token TTL.
    #[must_use]
    pub fn with_refresh_ttl(mut self, seconds: i64) -> Self {
        self.refresh_token_ttl = seconds;
        self
    }

    /// Enables refresh token rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotate: bool, blacklist_after: bool) -> Self {
        self.rotate_refresh_tokens = rotate;
        self.blacklist_after_rotation = blacklist_after;
        self
    }

    /// Adds a claim to every access token. Values that do not serialise are
    /// ignored.
    #[must_use]
    pub fn with_access_claim(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.access_claims.insert(key.into(), v);
        }
        self
    }
}

/// Token type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Access token.
    Access,
    /// Refresh token.
    Refresh,
}

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Username at issue time.
    pub username: String,
    /// Issuer.
    pub iss: String,
    /// Audience.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// JWT ID (unique identifier).
    pub jti: String,
    /// Token type.
    pub token_type: TokenType,
    /// Staff flag at issue time.
    #[serde(default)]
    pub is_staff: bool,
    /// Custom claims, stored beside the registered ones.
    #[serde(flatten)]
    pub custom: HashMap<String, serde_json::Value>,
}

impl TokenClaims {
    fn new(
        token_type: TokenType,
        user_id: UserId,
        username: &str,
        is_staff: bool,
        issuer: &str,
        ttl_seconds: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id.to_string(),
            username: username.to_string(),
            iss: issuer.to_string(),
            aud: None,
            exp: (now + Duration::seconds(ttl_seconds)).timestamp(),
            iat: now.timestamp(),
            jti: uuid::Uuid::new_v4().simple().to_string(),
            token_type,
            is_staff,
            custom: HashMap::new(),
        }
    }

    /// Sets audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.aud = Some(audience.into());
        self
    }

    /// Adds custom claim.
    #[must_use]
    pub fn with_custom(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.custom.insert(key.into(), v);
        }
        self
    }

    /// Parses the subject as a user id.
    pub fn user_id(&self) -> AccessResult<UserId> {
        self.sub
            .parse()
            .map_err(|_| AccessError::InvalidToken("Token contained no recognizable user identification".to_string()))
    }

    /// Checks if the token is expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Token pair (access + refresh).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token.
    pub access: String,
    /// Refresh token.
    pub refresh: String,
}

/// Result of exchanging a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshOutcome {
    /// New access token.
    pub access: String,
    /// Replacement refresh token when rotation is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
}

/// Issues, validates and blacklists JWTs.
pub struct TokenManager {
    config: TokenConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// Blacklisted refresh token ids mapped to their expiry.
    blacklist: RwLock<HashMap<String, i64>>,
}

impl TokenManager {
    /// Creates a new token manager.
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
            blacklist: RwLock::new(HashMap::new()),
        }
    }

    fn claims(&self, token_type: TokenType, user_id: UserId, username: &str, is_staff: bool) -> TokenClaims {
        let ttl = match token_type {
            TokenType::Access => self.config.access_token_ttl,
            TokenType::Refresh => self.config.refresh_token_ttl,
        };
        let mut claims = TokenClaims::new(token_type, user_id, username, is_staff, &self.config.issuer, ttl);
        if let Some(ref aud) = self.config.audience {
            claims = claims.with_audience(aud);
        }
        if token_type == TokenType::Access {
            for (key, value) in &self.config.access_claims {
                claims = claims.with_custom(key.clone(), value);
            }
        }
        claims
    }

    /// Creates a token pair (access + refresh) for a user.
    pub fn create_token_pair(&self, user: &User) -> AccessResult<TokenPair> {
        let access = self.encode(&self.claims(TokenType::Access, user.id, &user.username, user.is_staff))?;
        let refresh = self.encode(&self.claims(TokenType::Refresh, user.id, &user.username, user.is_staff))?;

        debug!(user_id = %user.id, "Issued token pair");
        Ok(TokenPair { access, refresh })
    }

    /// Encodes claims into a token.
    pub fn encode(&self, claims: &TokenClaims) -> AccessResult<String> {
        let header = Header::new(self.config.algorithm);
        encode(&header, claims, &self.encoding_key)
            .map_err(|e| AccessError::InvalidToken(e.to_string()))
    }

    /// Decodes a token and checks signature, issuer and expiry.
    pub fn decode(&self, token: &str) -> AccessResult<TokenClaims> {
        let mut validation = Validation::new(self.config.algorithm);
        validation.set_issuer(&[&self.config.issuer]);

        match self.config.audience {
            Some(ref aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }

        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AccessError::TokenExpired,
                _ => AccessError::InvalidToken(e.to_string()),
            })?;

        let claims = token_data.claims;
        if claims.is_expired() {
            return Err(AccessError::TokenExpired);
        }
        Ok(claims)
    }

    /// Validates an access token and returns its claims.
    pub fn validate_access(&self, token: &str) -> AccessResult<TokenClaims> {
        let claims = self.decode(token)?;
        if claims.token_type != TokenType::Access {
            return Err(AccessError::InvalidToken("Token has wrong type".to_string()));
        }
        Ok(claims)
    }

    fn validate_refresh(&self, token: &str) -> AccessResult<TokenClaims> {
        let claims = self.decode(token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AccessError::InvalidToken("Token has wrong type".to_string()));
        }
        if self.is_blacklisted(&claims.jti) {
            return Err(AccessError::TokenBlacklisted);
        }
        Ok(claims)
    }

    /// Exchanges a refresh token for a new access token.
    ///
    /// With rotation enabled a replacement refresh token is issued too, and
    /// the old one is blacklisted when `blacklist_after_rotation` is set.
    pub fn refresh(&self, refresh_token: &str) -> AccessResult<RefreshOutcome> {
        let claims = self.validate_refresh(refresh_token)?;
        let user_id = claims.user_id()?;

        let access = self.encode(&self.claims(TokenType::Access, user_id, &claims.username, claims.is_staff))?;

        let refresh = if self.config.rotate_refresh_tokens {
            if self.config.blacklist_after_rotation {
                self.blacklist_claims(&claims);
            }
            Some(self.encode(&self.claims(TokenType::Refresh, user_id, &claims.username, claims.is_staff))?)
        } else {
            None
        };

        Ok(RefreshOutcome { access, refresh })
    }

    /// Blacklists a refresh token. Blacklisting twice is a no-op.
    pub fn blacklist(&self, refresh_token: &str) -> AccessResult<()> {
        let claims = self.decode(refresh_token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AccessError::InvalidToken("Token has wrong type".to_string()));
        }
        self.blacklist_claims(&claims);
        Ok(())
    }

    fn blacklist_claims(&self, claims: &TokenClaims) {
        let inserted = self
            .blacklist
            .write()
            .insert(claims.jti.clone(), claims.exp)
            .is_none();
        if inserted {
            info!(jti = %claims.jti, user_id = %claims.sub, "Refresh token blacklisted");
        }
    }

    /// Returns true if the token id is blacklisted.
    #[must_use]
    pub fn is_blacklisted(&self, jti: &str) -> bool {
        self.blacklist.read().contains_key(jti)
    }

    /// Drops blacklist entries whose tokens have expired anyway.
    pub fn flush_expired(&self) -> usize {
        let now = Utc::now().timestamp();
        let mut blacklist = self.blacklist.write();
        let before = blacklist.len();
        blacklist.retain(|_, exp| *exp > now);
        let removed = before - blacklist.len();
        if removed > 0 {
            debug!(removed, "Flushed expired blacklist entries");
        }
        removed
    }

    /// Number of blacklisted tokens.
    #[must_use]
    pub fn blacklist_len(&self) -> usize {
        self.blacklist.read().len()
    }

    /// Returns the config.
    #[must_use]
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("issuer", &self.config.issuer)
            .field("blacklisted", &self.blacklist_len())
            .finish_non_exhaustive()
    }
}
