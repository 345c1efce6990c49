//! Authentication middleware.
//!
//! Resolves the caller from, in order: an `Authorization: Bearer` access
//! token, the `access_token` cookie, the session cookie. A malformed or
//! expired bearer token fails the request; stale cookies fall through to
//! anonymous. Session-authenticated unsafe requests must pass the CSRF
//! double-submit check.

use crate::{state::ACCESS_COOKIE, ApiError, AppState};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use directory_access::{cookie_value, SessionId, TokenClaims};
use directory_core::{User, UserId};
use std::sync::Arc;
use tracing::debug;

/// How the caller authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// `Authorization: Bearer` header.
    Bearer,
    /// `access_token` cookie.
    TokenCookie,
    /// Server-side session cookie.
    Session,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// User id.
    pub user_id: UserId,
    /// Username.
    pub username: String,
    /// Staff flag.
    pub is_staff: bool,
    /// How the caller authenticated.
    pub method: AuthMethod,
}

impl Principal {
    fn from_claims(claims: &TokenClaims, method: AuthMethod) -> Result<Self, ApiError> {
        Ok(Self {
            user_id: claims.user_id()?,
            username: claims.username.clone(),
            is_staff: claims.is_staff,
            method,
        })
    }

    fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            is_staff: user.is_staff,
            method: AuthMethod::Session,
        }
    }
}

/// Methods that never need CSRF protection.
#[must_use]
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

/// Authentication layer function.
pub async fn auth_layer(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // Cloned so no borrow of the (non-Sync) request lives across the await.
    let headers = req.headers().clone();
    let principal = resolve_principal(&state, &headers).await?;

    if let Some(principal) = &principal {
        if principal.method == AuthMethod::Session && !is_safe_method(req.method()) {
            check_csrf(&state, &headers)?;
        }
        debug!(user = %principal.username, method = ?principal.method, "Request authenticated");
        req.extensions_mut().insert(principal.clone());
    }

    let mut response = next.run(req).await;
    if let Some(principal) = principal {
        response.extensions_mut().insert(principal);
    }
    Ok(response)
}

/// Runs the CSRF double-submit check against the request headers.
pub fn check_csrf(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let cookies = cookie_header(headers);
    let cookie = cookie_value(cookies, &state.csrf.cookie().name);
    let token = headers
        .get(state.csrf.header_name())
        .and_then(|v| v.to_str().ok());
    state.csrf.verify(cookie, token)?;
    Ok(())
}

/// The raw `Cookie` header, or an empty string.
#[must_use]
pub fn cookie_header(headers: &HeaderMap) -> &str {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

async fn resolve_principal(state: &AppState, headers: &HeaderMap) -> Result<Option<Principal>, ApiError> {
    if let Some(value) = headers.get(header::AUTHORIZATION) {
        let raw = value
            .to_str()
            .map_err(|_| ApiError::Unauthorized("Invalid Authorization header.".to_string()))?;
        if let Some(token) = raw.strip_prefix("Bearer ") {
            let claims = state.tokens.validate_access(token.trim())?;
            return Principal::from_claims(&claims, AuthMethod::Bearer).map(Some);
        }
    }

    let cookies = cookie_header(headers);
    if let Some(token) = cookie_value(cookies, ACCESS_COOKIE) {
        match state
            .tokens
            .validate_access(token)
            .map_err(ApiError::from)
            .and_then(|claims| Principal::from_claims(&claims, AuthMethod::TokenCookie))
        {
            Ok(principal) => return Ok(Some(principal)),
            Err(e) => debug!(error = %e, "Ignoring unusable access token cookie"),
        }
    }

    let session_cookie = state.sessions.cookie();
    let Some(session_id) = cookie_value(cookies, &session_cookie.name)
        .and_then(|raw| SessionId::from_string(raw).ok())
    else {
        return Ok(None);
    };
    let session = match state.sessions.get_session(&session_id) {
        Ok(session) => session,
        Err(e) => {
            debug!(error = %e, "Ignoring unusable session cookie");
            return Ok(None);
        }
    };

    match state.store.get_user(session.user_id).await {
        Ok(user) if user.is_active => Ok(Some(Principal::from_user(&user))),
        Ok(_) => Ok(None),
        Err(e) => {
            debug!(error = %e, user_id = %session.user_id, "Session user no longer loads");
            Ok(None)
        }
    }
}
