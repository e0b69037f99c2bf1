//! Event shim core: the event model, endpoint descriptors, and response envelopes.

pub mod endpoint;
pub mod envelope;
pub mod event;

pub use endpoint::{EndpointDescriptor, CLUSTER_DOMAIN};
pub use envelope::{BatchItemFailure, BatchResponse, GatewayResponse};
pub use event::{Event, EventKind};

/// `eventSource` value carried by queue (SQS) records.
pub const QUEUE_EVENT_SOURCE: &str = "aws:sqs";
