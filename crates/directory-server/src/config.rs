//! Server configuration.

use std::collections::HashMap;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use directory_access::{SessionConfig, TokenConfig};
use directory_crypto::EncryptionKey;
use directory_storage::PgStoreConfig;
use serde::{Deserialize, Serialize};

const DEFAULT_SECRET_KEY: &str = "change-me-in-production";

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Service name.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Server host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Debug mode. Auth cookies drop `Secure` and error bodies keep their
    /// internal detail.
    #[serde(default)]
    pub debug: bool,

    /// JWT signing secret.
    #[serde(default = "default_secret_key")]
    pub secret_key: String,

    /// Base64 key for supplier website passwords. Required.
    #[serde(default)]
    pub password_encryption_key: Option<String>,

    /// Token lifetimes.
    #[serde(default)]
    pub tokens: TokenSettings,

    /// Login sessions.
    #[serde(default = "default_session")]
    pub session: SessionConfig,

    /// Maximum request body size.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,

    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Seconds between blacklist and session sweeps.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,

    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// JWT settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenSettings {
    /// Issuer claim.
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Audience claim.
    #[serde(default)]
    pub audience: Option<String>,

    /// Access token lifetime in seconds.
    #[serde(default = "default_access_ttl")]
    pub access_ttl_secs: i64,

    /// Refresh token lifetime in seconds.
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_secs: i64,

    /// Issue a new refresh token on every refresh.
    #[serde(default)]
    pub rotate_refresh_tokens: bool,

    /// Blacklist the old refresh token after rotation.
    #[serde(default = "default_true")]
    pub blacklist_after_rotation: bool,

    /// Extra string claims added to access tokens.
    #[serde(default)]
    pub access_claims: HashMap<String, String>,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            audience: None,
            access_ttl_secs: default_access_ttl(),
            refresh_ttl_secs: default_refresh_ttl(),
            rotate_refresh_tokens: false,
            blacklist_after_rotation: true,
            access_claims: HashMap::new(),
        }
    }
}

/// Database configuration. Without a URL the server keeps everything in
/// memory.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL.
    pub url: Option<String>,

    /// Maximum connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection.
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout(),
        }
    }
}

impl DatabaseConfig {
    /// PostgreSQL settings, if a URL is configured.
    pub fn store_config(&self) -> Option<PgStoreConfig> {
        self.url.as_ref().filter(|url| !url.is_empty()).map(|url| PgStoreConfig {
            url: url.clone(),
            max_connections: self.max_connections,
            acquire_timeout_secs: self.acquire_timeout_secs,
        })
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format (json, pretty).
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_service_name() -> String {
    "supplier-directory".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_secret_key() -> String {
    DEFAULT_SECRET_KEY.to_string()
}

fn default_issuer() -> String {
    "supplier-directory".to_string()
}

fn default_access_ttl() -> i64 {
    300
}

fn default_refresh_ttl() -> i64 {
    86_400
}

fn default_session() -> SessionConfig {
    SessionConfig::default()
}

fn default_max_body_size() -> usize {
    2 * 1024 * 1024
}

fn default_cleanup_interval() -> u64 {
    300
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl ServerConfig {
    /// Loads configuration from files and environment.
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            .set_default("service_name", default_service_name())?
            .set_default("host", default_host())?
            .set_default("port", default_port())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("DIRECTORY")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Validates the configuration.
    fn validate(&self) -> Result<()> {
        if !self.debug && self.secret_key == DEFAULT_SECRET_KEY {
            tracing::warn!("Using default secret key in non-debug mode!");
        }

        if self.port == 0 {
            anyhow::bail!("Invalid port: 0");
        }

        self.encryption_key()?;
        Ok(())
    }

    /// Decodes the supplier password key.
    pub fn encryption_key(&self) -> Result<EncryptionKey> {
        let encoded = self
            .password_encryption_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .context("password_encryption_key is not set")?;
        EncryptionKey::from_base64(encoded.trim()).context("password_encryption_key is not a valid key")
    }

    /// JWT manager settings.
    pub fn token_config(&self) -> TokenConfig {
        let mut config = TokenConfig::new(self.secret_key.clone())
            .with_issuer(self.tokens.issuer.clone())
            .with_access_ttl(self.tokens.access_ttl_secs)
            .with_refresh_ttl(self.tokens.refresh_ttl_secs)
            .with_rotation(self.tokens.rotate_refresh_tokens, self.tokens.blacklist_after_rotation);
        if let Some(audience) = &self.tokens.audience {
            config = config.with_audience(audience.clone());
        }
        for (key, value) in &self.tokens.access_claims {
            config = config.with_access_claim(key.clone(), value);
        }
        config
    }

    /// Session settings; debug mode drops the `Secure` cookie flag.
    pub fn session_config(&self) -> SessionConfig {
        let mut session = self.session.clone();
        if self.debug {
            session.secure_cookies = false;
        }
        session
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            host: default_host(),
            port: default_port(),
            debug: false,
            secret_key: default_secret_key(),
            password_encryption_key: None,
            tokens: TokenSettings::default(),
            session: default_session(),
            max_body_size: default_max_body_size(),
            cors_origins: Vec::new(),
            cleanup_interval_secs: default_cleanup_interval(),
            database: DatabaseConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_key() -> ServerConfig {
        ServerConfig {
            password_encryption_key: Some(EncryptionKey::generate().to_base64()),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "0.0.0.0");
        assert!(!config.debug);
        assert_eq!(config.tokens.access_ttl_secs, 300);
        assert_eq!(config.tokens.refresh_ttl_secs, 86_400);
    }

    #[test]
    fn test_config_validation() {
        let mut config = with_key();
        assert!(config.validate().is_ok());

        config.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_encryption_key_is_required() {
        let mut config = ServerConfig::default();
        assert!(config.validate().is_err());

        config.password_encryption_key = Some("   ".into());
        assert!(config.validate().is_err());

        config.password_encryption_key = Some("too-short".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_url_selects_postgres() {
        let mut config = ServerConfig::default();
        assert!(config.database.store_config().is_none());

        config.database.url = Some(String::new());
        assert!(config.database.store_config().is_none());

        config.database.url = Some("postgres://db/directory".into());
        config.database.max_connections = 4;
        let pg = config.database.store_config().unwrap();
        assert_eq!(pg.url, "postgres://db/directory");
        assert_eq!(pg.max_connections, 4);
    }

    #[test]
    fn test_debug_drops_secure_session_cookie() {
        let mut config = with_key();
        assert!(config.session_config().secure_cookies);

        config.debug = true;
        assert!(!config.session_config().secure_cookies);
    }

    #[test]
    fn test_token_config_carries_lifetimes() {
        let mut config = with_key();
        config.tokens.access_ttl_secs = 60;
        config.tokens.audience = Some("suppliers".into());

        let tokens = config.token_config();
        assert_eq!(tokens.access_token_ttl, 60);
        assert_eq!(tokens.audience.as_deref(), Some("suppliers"));
        assert_eq!(tokens.secret, DEFAULT_SECRET_KEY);
    }

    #[test]
    fn test_token_config_carries_access_claims() {
        let mut config = with_key();
        config
            .tokens
            .access_claims
            .insert("custom_claim".into(), "custom_value".into());

        let tokens = config.token_config();
        assert_eq!(tokens.access_claims["custom_claim"], "custom_value");
    }
}
