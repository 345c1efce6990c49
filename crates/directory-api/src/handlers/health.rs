//! Health check handlers.

use crate::response::{HealthCheck, HealthResponse, HealthStatus};
use crate::state::AppState;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::warn;

/// Liveness probe: `{"status":"ok"}`.
pub async fn healthz_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Readiness probe; 503 when the store does not answer.
pub async fn readiness_handler(State(state): State<Arc<AppState>>) -> HealthResponse {
    HealthResponse::healthy(state.config.service_name.clone(), env!("CARGO_PKG_VERSION"))
        .with_check(check_store(&state).await)
}

async fn check_store(state: &AppState) -> HealthCheck {
    let start = Instant::now();
    let result = state.store.ping().await;
    let response_time_ms = Some(u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX));

    match result {
        Ok(()) => HealthCheck {
            name: state.store.name().to_string(),
            status: HealthStatus::Healthy,
            message: None,
            response_time_ms,
        },
        Err(e) => {
            warn!(error = %e, backend = state.store.name(), "Store readiness check failed");
            HealthCheck {
                name: state.store.name().to_string(),
                status: HealthStatus::Unhealthy,
                message: Some(e.to_string()),
                response_time_ms,
            }
        }
    }
}
