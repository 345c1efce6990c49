//! # Directory Access
//!
//! Authentication building blocks for the supplier directory:
//! - JWT access/refresh pairs with a refresh-token blacklist
//! - Server-side sessions behind an opaque cookie
//! - Double-submit CSRF tokens
//! - `Set-Cookie` rendering and `Cookie` header parsing

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cookie;
pub mod csrf;
pub mod error;
pub mod session;
pub mod token;

pub use cookie::{cookie_value, CookieSpec, SameSite};
pub use csrf::CsrfGuard;
pub use error::{AccessError, AccessResult};
pub use session::{CleanupStats, IssuedSession, Session, SessionConfig, SessionId, SessionManager};
pub use token::{RefreshOutcome, TokenClaims, TokenConfig, TokenManager, TokenPair, TokenType};
