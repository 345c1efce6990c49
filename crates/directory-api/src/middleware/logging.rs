//! Request ID propagation and access logging.

use crate::middleware::auth::Principal;
use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Header carrying the request ID in both directions.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const MAX_REQUEST_ID_LEN: usize = 128;

tokio::task_local! {
    static REQUEST_ID: String;
}

/// The request ID of the request being served, if any.
#[must_use]
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(Clone::clone).ok()
}

/// Request ID attached to request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Logging layer function.
///
/// Reuses an inbound `X-Request-ID` when it is short printable ASCII,
/// otherwise generates a UUIDv4. The ID is echoed on the response, scoped
/// for error bodies, and carried by the request span.
pub async fn logging_layer(mut req: Request, next: Next) -> Response {
    let request_id = extract_or_generate_request_id(&req);
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let start = Instant::now();
    let mut response = REQUEST_ID
        .scope(request_id.clone(), next.run(req))
        .instrument(span.clone())
        .await;
    let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    let status = response.status().as_u16();
    let user = response
        .extensions()
        .get::<Principal>()
        .map_or_else(|| "-".to_string(), |p| p.username.clone());

    span.in_scope(|| {
        if status >= 500 {
            warn!(status, duration_ms, path = %path, method = %method, user = %user, "request complete");
        } else {
            info!(status, duration_ms, path = %path, method = %method, user = %user, "request complete");
        }
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Extracts or generates a request ID.
fn extract_or_generate_request_id(req: &Request) -> String {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| {
            !id.is_empty()
                && id.len() <= MAX_REQUEST_ID_LEN
                && id.bytes().all(|b| b.is_ascii_graphic())
        })
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string)
}
