//! Session authentication handlers.

use crate::{
    error::ApiError,
    extract::{AuthUser, JsonBody},
    middleware::auth::{check_csrf, cookie_header},
    response::WithCookies,
    state::AppState,
    ApiResult,
};
use axum::{extract::State, http::HeaderMap, Json};
use directory_access::{cookie_value, SessionId};
use directory_core::User;
use directory_crypto::verify_password;
use directory_storage::StorageError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

/// Message for any failed credential check; never says which part was wrong.
pub const BAD_CREDENTIALS: &str = "No active account found with the given credentials";

/// Login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Username.
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub username: String,
    /// Password.
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,
}

/// The signed-in user.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserInfo {
    /// User id.
    pub id: i64,
    /// Username.
    pub username: String,
    /// Staff flag.
    pub is_staff: bool,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.get(),
            username: user.username.clone(),
            is_staff: user.is_staff,
        }
    }
}

/// Checks a username/password pair against the store.
///
/// Unknown users, inactive users and wrong passwords all fail the same way.
pub async fn authenticate(state: &AppState, username: &str, password: &str) -> ApiResult<User> {
    let user = state.store.find_user_by_username(username).await?;
    match user {
        Some(user) if user.is_active && verify_password(password, &user.password_hash) => Ok(user),
        _ => {
            warn!(username = %username, "Failed login attempt");
            Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()))
        }
    }
}

/// Issues a CSRF token in the cookie and the body.
pub async fn csrf_handler(State(state): State<Arc<AppState>>) -> WithCookies<Json<Value>> {
    let token = state.csrf.issue();
    let cookie = state.csrf.cookie().to_header(&token);
    WithCookies::new(Json(json!({ "csrfToken": token }))).cookie(cookie)
}

/// Session login. Requires the CSRF double-submit pair.
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    JsonBody(request): JsonBody<LoginRequest>,
) -> ApiResult<WithCookies<Json<UserInfo>>> {
    check_csrf(&state, &headers)?;
    request.validate()?;

    let user = authenticate(&state, &request.username, &request.password).await?;
    let issued = state.sessions.create_session(&user);
    info!(user_id = %user.id, username = %user.username, "User logged in");

    // The CSRF token rotates on login.
    let csrf = state.csrf.cookie().to_header(&state.csrf.issue());
    let session = state.sessions.cookie().to_header(issued.id.as_str());

    Ok(WithCookies::new(Json(UserInfo::from(&user)))
        .cookie(session)
        .cookie(csrf))
}

/// Session logout. Unknown or missing sessions still log out cleanly.
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<WithCookies<Json<Value>>> {
    check_csrf(&state, &headers)?;

    let session_cookie = state.sessions.cookie();
    if let Some(id) = cookie_value(cookie_header(&headers), &session_cookie.name)
        .and_then(|raw| SessionId::from_string(raw).ok())
    {
        state.sessions.destroy_session(&id);
    }

    Ok(WithCookies::new(Json(json!({ "detail": "Successfully logged out." })))
        .cookie(session_cookie.removal_header()))
}

/// The current user, or 401.
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    AuthUser(principal): AuthUser,
) -> ApiResult<Json<UserInfo>> {
    let user = state
        .store
        .get_user(principal.user_id)
        .await
        .map_err(missing_user_is_unauthenticated)?;
    Ok(Json(UserInfo::from(&user)))
}

/// A principal whose user row is gone is treated as logged out; any other
/// store failure stays a server error.
fn missing_user_is_unauthenticated(err: StorageError) -> ApiError {
    match err {
        StorageError::NotFound { .. } => ApiError::not_authenticated(),
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_deleted_user_is_unauthenticated() {
        let err = missing_user_is_unauthenticated(StorageError::not_found("user", 7));
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_backend_failure_is_server_error() {
        let err = missing_user_is_unauthenticated(StorageError::Backend("pool timed out".into()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
