//! Health, liveness, and readiness endpoint handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use super::AppState;
use crate::network::HealthState;

/// Detailed health as JSON.
///
/// Always 200; `status` and `state` in the body carry the actual health.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let health = state.shutdown.health_state();
    let status = if health == HealthState::Ready {
        "healthy"
    } else {
        "unhealthy"
    };

    Json(json!({
        "status": status,
        "state": health.as_str(),
        "services": state.registry.len(),
        "in_flight": state.shutdown.in_flight_count(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Liveness probe: 200 whenever the process can answer at all.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe: 200 when ready, 503 while starting, draining or stopped.
pub async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.shutdown.health_state() == HealthState::Ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
