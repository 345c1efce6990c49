//! Server-side session management.
//!
//! Provides cookie-backed login sessions including:
//! - Secure session ID generation
//! - Session expiration and idle timeout
//! - Concurrent session limits
//!
//! Only the SHA-256 digest of a session id is kept in memory; the raw id
//! lives in the client's cookie.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use directory_core::{User, UserId};
use directory_crypto::{random_hex, sha256_hex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cookie::CookieSpec;
use crate::error::{AccessError, AccessResult};

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session lifetime in seconds.
    pub session_ttl_secs: u64,
    /// Idle timeout in seconds.
    pub idle_timeout_secs: u64,
    /// Oldest sessions are dropped past this count.
    pub max_sessions_per_user: usize,
    /// Cookie name.
    pub cookie_name: String,
    /// Whether to use secure cookies.
    pub secure_cookies: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 1_209_600, // two weeks
            idle_timeout_secs: 1_209_600,
            max_sessions_per_user: 10,
            cookie_name: "sessionid".to_string(),
            secure_cookies: true,
        }
    }
}

impl SessionConfig {
    fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// A unique session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new random session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(random_hex(32))
    }

    /// Parses a session ID from a cookie value.
    pub fn from_string(s: impl Into<String>) -> AccessResult<Self> {
        let s = s.into();

        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AccessError::SessionNotFound);
        }

        Ok(Self(s))
    }

    /// Returns the session ID as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn digest(&self) -> String {
        sha256_hex(self.0.as_bytes())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session data stored for each login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Digest of the session id.
    pub key: String,
    /// User ID associated with the session.
    pub user_id: UserId,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
    /// Last activity time.
    pub last_activity: DateTime<Utc>,
}

impl Session {
    fn new(key: String, user_id: UserId, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            key,
            user_id,
            created_at: now,
            expires_at: now + chrono::Duration::from_std(ttl).unwrap_or_default(),
            last_activity: now,
        }
    }

    /// Checks if the session is expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Checks if the session is idle (past idle timeout).
    #[must_use]
    pub fn is_idle(&self, idle_timeout: Duration) -> bool {
        let idle_since = Utc::now().signed_duration_since(self.last_activity);
        idle_since > chrono::Duration::from_std(idle_timeout).unwrap_or_default()
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

/// A freshly created session and the raw id for the cookie.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Raw id; only ever sent to the client.
    pub id: SessionId,
    /// Stored session.
    pub session: Session,
}

/// Session manager for handling user sessions.
pub struct SessionManager {
    config: SessionConfig,
    sessions: DashMap<String, Session>,
    user_sessions: DashMap<UserId, Vec<String>>,
}

impl SessionManager {
    /// Creates a new session manager with the given configuration.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: DashMap::new(),
            user_sessions: DashMap::new(),
        }
    }

    /// Creates a new session for a user, dropping their oldest session when
    /// the per-user limit is reached.
    pub fn create_session(&self, user: &User) -> IssuedSession {
        let live = self.user_session_keys(user.id);
        if live.len() >= self.config.max_sessions_per_user {
            if let Some(oldest) = live.first() {
                self.remove_key(oldest);
            }
        }

        let id = SessionId::new();
        let session = Session::new(id.digest(), user.id, self.config.session_ttl());

        self.sessions.insert(session.key.clone(), session.clone());
        self.user_sessions
            .entry(user.id)
            .or_default()
            .push(session.key.clone());

        debug!(user_id = %user.id, "Created session");
        IssuedSession { id, session }
    }

    /// Gets a live session and records activity.
    pub fn get_session(&self, session_id: &SessionId) -> AccessResult<Session> {
        let key = session_id.digest();
        let mut session = self
            .sessions
            .get(&key)
            .map(|s| s.clone())
            .ok_or(AccessError::SessionNotFound)?;

        if session.is_expired() || session.is_idle(self.config.idle_timeout()) {
            self.remove_key(&key);
            return Err(AccessError::SessionExpired);
        }

        session.touch();
        self.sessions.insert(key, session.clone());
        Ok(session)
    }

    /// Destroys a session. Unknown ids are ignored.
    pub fn destroy_session(&self, session_id: &SessionId) {
        if let Some(session) = self.remove_key(&session_id.digest()) {
            debug!(user_id = %session.user_id, "Destroyed session");
        }
    }

    /// Destroys all sessions for a user.
    pub fn destroy_user_sessions(&self, user_id: UserId) {
        if let Some((_, keys)) = self.user_sessions.remove(&user_id) {
            for key in keys {
                self.sessions.remove(&key);
            }
            info!(user_id = %user_id, "Destroyed all sessions for user");
        }
    }

    fn remove_key(&self, key: &str) -> Option<Session> {
        let (_, session) = self.sessions.remove(key)?;
        if let Some(mut keys) = self.user_sessions.get_mut(&session.user_id) {
            keys.retain(|k| k != key);
        }
        Some(session)
    }

    fn user_session_keys(&self, user_id: UserId) -> Vec<String> {
        self.user_sessions
            .get(&user_id)
            .map(|keys| {
                keys.iter()
                    .filter(|k| {
                        self.sessions
                            .get(k.as_str())
                            .is_some_and(|s| !s.is_expired())
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Gets the live session count for a user.
    #[must_use]
    pub fn user_session_count(&self, user_id: UserId) -> usize {
        self.user_session_keys(user_id).len()
    }

    /// Cleans up expired and idle sessions.
    pub fn cleanup(&self) -> CleanupStats {
        let idle_timeout = self.config.idle_timeout();
        let stale: Vec<(String, bool)> = self
            .sessions
            .iter()
            .filter_map(|entry| {
                let s = entry.value();
                if s.is_expired() {
                    Some((entry.key().clone(), true))
                } else if s.is_idle(idle_timeout) {
                    Some((entry.key().clone(), false))
                } else {
                    None
                }
            })
            .collect();

        let mut stats = CleanupStats::default();
        for (key, expired) in stale {
            if self.remove_key(&key).is_some() {
                if expired {
                    stats.expired_removed += 1;
                } else {
                    stats.idle_removed += 1;
                }
            }
        }
        stats.total_active = self.sessions.len();

        if stats.expired_removed > 0 || stats.idle_removed > 0 {
            info!(
                expired = stats.expired_removed,
                idle = stats.idle_removed,
                active = stats.total_active,
                "Session cleanup"
            );
        }
        stats
    }

    /// Returns the total number of stored sessions.
    #[must_use]
    pub fn active_session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Returns the session cookie specification.
    #[must_use]
    pub fn cookie(&self) -> CookieSpec {
        CookieSpec::new(&self.config.cookie_name)
            .max_age(self.config.session_ttl_secs)
            .http_only(true)
            .secure(self.config.secure_cookies)
    }
}

/// Cleanup statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupStats {
    /// Number of expired sessions removed.
    pub expired_removed: usize,
    /// Number of idle sessions removed.
    pub idle_removed: usize,
    /// Total sessions remaining.
    pub total_active: usize,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("active_sessions", &self.sessions.len())
            .field("users_with_sessions", &self.user_sessions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use directory_core::NewUser;

    fn test_config() -> SessionConfig {
        SessionConfig {
            session_ttl_secs: 3600,
            idle_timeout_secs: 1800,
            max_sessions_per_user: 3,
            ..Default::default()
        }
    }

    fn user(id: i64) -> User {
        NewUser {
            username: format!("user{id}"),
            password_hash: String::new(),
            is_staff: false,
        }
        .into_user(UserId::new(id))
    }

    #[test]
    fn test_create_and_get_session() {
        let manager = SessionManager::new(test_config());
        let issued = manager.create_session(&user(1));

        assert_ne!(issued.session.key, issued.id.as_str());
        let session = manager.get_session(&issued.id).unwrap();
        assert_eq!(session.user_id, UserId::new(1));
        assert!(session.last_activity >= issued.session.last_activity);
    }

    #[test]
    fn test_unknown_session() {
        let manager = SessionManager::new(test_config());
        assert!(matches!(
            manager.get_session(&SessionId::new()),
            Err(AccessError::SessionNotFound)
        ));
    }

    #[test]
    fn test_destroy_session() {
        let manager = SessionManager::new(test_config());
        let issued = manager.create_session(&user(1));

        manager.destroy_session(&issued.id);
        manager.destroy_session(&issued.id);

        assert!(manager.get_session(&issued.id).is_err());
        assert_eq!(manager.user_session_count(UserId::new(1)), 0);
    }

    #[test]
    fn test_max_sessions_per_user() {
        let manager = SessionManager::new(test_config());
        let first = manager.create_session(&user(1));
        for _ in 0..3 {
            manager.create_session(&user(1));
        }

        assert_eq!(manager.user_session_count(UserId::new(1)), 3);
        assert!(manager.get_session(&first.id).is_err());
    }

    #[test]
    fn test_destroy_user_sessions() {
        let manager = SessionManager::new(test_config());
        let a = manager.create_session(&user(1));
        let b = manager.create_session(&user(2));

        manager.destroy_user_sessions(UserId::new(1));

        assert!(manager.get_session(&a.id).is_err());
        assert!(manager.get_session(&b.id).is_ok());
    }

    #[test]
    fn test_cleanup_expired() {
        let manager = SessionManager::new(test_config());
        let issued = manager.create_session(&user(1));
        manager.create_session(&user(2));

        if let Some(mut s) = manager.sessions.get_mut(&issued.session.key) {
            s.expires_at = Utc::now() - chrono::Duration::seconds(1);
        }

        let stats = manager.cleanup();
        assert_eq!(stats.expired_removed, 1);
        assert_eq!(stats.total_active, 1);
    }

    #[test]
    fn test_idle_session_rejected() {
        let manager = SessionManager::new(test_config());
        let issued = manager.create_session(&user(1));
        if let Some(mut s) = manager.sessions.get_mut(&issued.session.key) {
            s.last_activity = Utc::now() - chrono::Duration::seconds(1801);
        }
        assert!(matches!(
            manager.get_session(&issued.id),
            Err(AccessError::SessionExpired)
        ));
    }

    #[test]
    fn test_session_id_validation() {
        assert!(SessionId::from_string("a".repeat(64)).is_ok());
        assert!(SessionId::from_string("short").is_err());
        assert!(SessionId::from_string("g".repeat(64)).is_err());
    }

    #[test]
    fn test_cookie() {
        let manager = SessionManager::new(test_config());
        let cookie = manager.cookie();
        assert_eq!(cookie.name, "sessionid");
        assert!(cookie.http_only);
        assert!(cookie.secure);
        assert_eq!(cookie.max_age, Some(3600));
    }
}
