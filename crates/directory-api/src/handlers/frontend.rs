//! The single-page frontend shell.

use crate::middleware::auth::cookie_header;
use crate::response::WithCookies;
use crate::state::AppState;
use axum::{extract::State, http::HeaderMap, response::Html};
use directory_access::cookie_value;
use std::sync::Arc;

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <title>Supplier Directory</title>
  </head>
  <body>
    <div id="root"></div>
    <script src="/static/frontend/main.js"></script>
  </body>
</html>
"#;

/// Serves the frontend shell and makes sure the browser holds a CSRF cookie.
pub async fn index_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> WithCookies<Html<&'static str>> {
    let response = WithCookies::new(Html(INDEX_HTML));
    let existing = cookie_value(cookie_header(&headers), &state.csrf.cookie().name);
    match existing {
        Some(token) if !token.is_empty() => response,
        _ => response.cookie(state.csrf.cookie().to_header(&state.csrf.issue())),
    }
}
