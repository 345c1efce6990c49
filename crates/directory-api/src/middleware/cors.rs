//! CORS middleware configuration.

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

fn allowed_methods() -> [Method; 6] {
    [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ]
}

fn allowed_headers() -> [HeaderName; 6] {
    [
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        header::ACCEPT,
        header::ORIGIN,
        HeaderName::from_static("x-request-id"),
        HeaderName::from_static("x-csrftoken"),
    ]
}

/// Creates the CORS layer.
///
/// With no configured origins any origin may read responses but browsers
/// send no credentials. With origins listed, only those are allowed and
/// cookies are accepted, which the session and JWT-cookie flows need.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods(allowed_methods())
        .allow_headers(allowed_headers())
        .expose_headers([HeaderName::from_static("x-request-id")])
        .max_age(std::time::Duration::from_secs(3600));

    if origins.is_empty() {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    base.allow_origin(origins).allow_credentials(true)
}
