//! Pipeline composition: wraps the engine in the tower layers.

use serde_json::Value;
use shim_core::Event;
use tower::util::BoxCloneSyncService;
use tower::ServiceBuilder;

use super::load_shed::LoadShedLayer;
use super::metrics::EventMetricsLayer;
use crate::service::config::ServerConfig;
use crate::service::engine::ShimEngine;
use crate::service::error::PipelineError;

/// Type-erased, cloneable event service handed to the HTTP boundary.
pub type EventService = BoxCloneSyncService<Event, Value, PipelineError>;

/// Builds the event service by wrapping `engine` with the tower layers.
///
/// Layer order (outermost to innermost):
/// 1. `LoadShedLayer` -- reject when overloaded, before doing any work
/// 2. `EventMetricsLayer` -- record timing and outcome around the engine
#[must_use]
pub fn build_event_service(engine: ShimEngine, config: &ServerConfig) -> EventService {
    let service = ServiceBuilder::new()
        .layer(LoadShedLayer::new(config.max_concurrent_events))
        .layer(EventMetricsLayer)
        .service(engine);
    BoxCloneSyncService::new(service)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
