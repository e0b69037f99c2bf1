//! Registered function listing.

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use super::AppState;

/// Every registered function with its resolved endpoint, sorted by name.
pub async fn services_handler(State(state): State<AppState>) -> Json<Value> {
    let services: Vec<Value> = state
        .registry
        .entries()
        .into_iter()
        .map(|(name, endpoint)| {
            json!({
                "name": name,
                "namespace": endpoint.namespace(),
                "service_name": endpoint.service_name(),
                "port": endpoint.port(),
                "path": endpoint.path(),
                "url": endpoint.url(),
            })
        })
        .collect();

    Json(json!({ "services": services }))
}
