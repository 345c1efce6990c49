//! JWT issuance, refresh and blacklist handlers.
//!
//! Tokens go back both in the body and in `HttpOnly` cookies, so browser
//! clients never have to touch them.

use crate::{
    error::ApiError,
    extract::JsonBody,
    handlers::auth::{authenticate, LoginRequest},
    middleware::auth::cookie_header,
    response::WithCookies,
    state::{AppState, ACCESS_COOKIE, REFRESH_COOKIE},
    ApiResult,
};
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use directory_access::{cookie_value, RefreshOutcome, TokenPair};
use directory_core::ValidationError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

/// Body of the refresh and blacklist calls.
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token; falls back to the `refresh_token` cookie.
    pub refresh: Option<String>,
}

/// Obtains an access/refresh pair for a username and password.
pub async fn obtain_pair_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> ApiResult<WithCookies<Json<TokenPair>>> {
    request.validate()?;
    let user = authenticate(&state, &request.username, &request.password).await?;
    let pair = state.tokens.create_token_pair(&user)?;
    info!(user_id = %user.id, "Issued token pair");

    let access = state.token_cookie(ACCESS_COOKIE).to_header(&pair.access);
    let refresh = state.token_cookie(REFRESH_COOKIE).to_header(&pair.refresh);
    Ok(WithCookies::new(Json(pair)).cookie(access).cookie(refresh))
}

/// Exchanges a refresh token for a new access token.
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<WithCookies<Json<RefreshOutcome>>> {
    let token = refresh_token(&headers, &body)?;
    let outcome = state.tokens.refresh(&token)?;

    let access = state.token_cookie(ACCESS_COOKIE).to_header(&outcome.access);
    let refresh = outcome
        .refresh
        .as_deref()
        .map(|token| state.token_cookie(REFRESH_COOKIE).to_header(token));

    let mut response = WithCookies::new(Json(outcome)).cookie(access);
    if let Some(refresh) = refresh {
        response = response.cookie(refresh);
    }
    Ok(response)
}

/// Blacklists a refresh token and clears both token cookies.
pub async fn blacklist_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<WithCookies<Json<Value>>> {
    let token = refresh_token(&headers, &body)?;
    state.tokens.blacklist(&token)?;

    Ok(WithCookies::new(Json(json!({})))
        .cookie(state.token_cookie(ACCESS_COOKIE).removal_header())
        .cookie(state.token_cookie(REFRESH_COOKIE).removal_header()))
}

/// Reads the refresh token from a JSON body, then from the cookie.
fn refresh_token(headers: &HeaderMap, body: &Bytes) -> ApiResult<String> {
    let request: RefreshRequest = if body.iter().all(u8::is_ascii_whitespace) {
        RefreshRequest::default()
    } else {
        serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("JSON parse error - {e}")))?
    };

    request
        .refresh
        .filter(|t| !t.is_empty())
        .or_else(|| {
            cookie_value(cookie_header(headers), REFRESH_COOKIE)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        })
        .ok_or_else(|| ValidationError::field("refresh", "This field is required.").into())
}
