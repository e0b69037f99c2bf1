//! HTTP handler definitions for the event shim.
//!
//! Defines `AppState` (the shared state carried through axum extractors)
//! and re-exports the handler functions used to build the router.

pub mod health;
pub mod invoke;
pub mod services;

pub use health::{health_handler, liveness_handler, readiness_handler};
pub use invoke::{
    api_gateway_handler, direct_handler, eventbridge_handler, invoke_handler, sqs_handler,
};
pub use services::services_handler;

use std::sync::Arc;
use std::time::Instant;

use super::ShutdownController;
use crate::service::{EndpointRegistry, EventService};

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Cloning is cheap: the event service is a boxed clone and the rest sits
/// behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Engine wrapped in load shedding and timing layers.
    pub events: EventService,
    /// Registry the engine resolves destinations against.
    pub registry: Arc<EndpointRegistry>,
    /// Health state and in-flight tracking.
    pub shutdown: Arc<ShutdownController>,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
