//! Tower layers wrapped around the event engine.
//!
//! - [`metrics`]: event timing and outcome via `tracing` spans
//! - [`load_shed`]: semaphore-based concurrency limiting
//! - [`pipeline`]: composes the layers into a single boxed service

pub mod load_shed;
pub mod metrics;
pub mod pipeline;

pub use load_shed::LoadShedLayer;
pub use metrics::EventMetricsLayer;
pub use pipeline::{build_event_service, EventService};
