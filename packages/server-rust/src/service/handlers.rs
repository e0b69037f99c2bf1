//! Per-kind event handlers.
//!
//! Every handler resolves the event's destination through the
//! [`EndpointRegistry`] and posts `{event, context}` to it via the shared
//! [`Forwarder`]. The handlers differ only in how they adapt the input
//! (queue batches fan out per record) and the reply (gateway wraps it).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use shim_core::envelope::{BatchResponse, GatewayResponse};
use shim_core::{Event, EventKind};
use tracing::{debug, warn};

use super::error::PipelineError;
use super::registry::EndpointRegistry;
use super::transport::Transport;

// ---------------------------------------------------------------------------
// EventHandler trait
// ---------------------------------------------------------------------------

/// Handles events of a single kind.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// The kind this handler is meant to be registered for.
    fn kind(&self) -> EventKind;

    /// Forwards the event and returns the kind-appropriate reply.
    async fn handle(&self, event: Event) -> Result<Value, PipelineError>;
}

// ---------------------------------------------------------------------------
// Forwarder (shared base behavior)
// ---------------------------------------------------------------------------

/// Resolves an event's destination and performs the outbound call.
#[derive(Clone)]
pub struct Forwarder {
    registry: Arc<EndpointRegistry>,
    transport: Arc<dyn Transport>,
}

impl Forwarder {
    pub fn new(registry: Arc<EndpointRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    /// Posts `{event: payload, context}` to the destination's endpoint.
    ///
    /// # Errors
    ///
    /// - `PipelineError::UnknownFunction` if the destination is not registered
    /// - any call failure reported by the transport
    pub async fn forward(&self, event: &Event) -> Result<Value, PipelineError> {
        let Some(endpoint) = self.registry.lookup(event.destination()) else {
            warn!(function = event.destination(), "no endpoint registered");
            return Err(PipelineError::UnknownFunction {
                name: event.destination().to_string(),
            });
        };

        let url = endpoint.url();
        let body = json!({
            "event": event.payload(),
            "context": event.context(),
        });
        debug!(function = event.destination(), url = %url, kind = %event.kind(), "calling backend");
        self.transport.post_json(&url, &body).await
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Wraps the backend reply in a `200` gateway envelope. Failures still
/// propagate as errors; the boundary turns them into HTTP statuses.
#[derive(Clone)]
pub struct ApiGatewayHandler {
    forwarder: Forwarder,
}

impl ApiGatewayHandler {
    pub fn new(forwarder: Forwarder) -> Self {
        Self { forwarder }
    }
}

#[async_trait]
impl EventHandler for ApiGatewayHandler {
    fn kind(&self) -> EventKind {
        EventKind::ApiGateway
    }

    async fn handle(&self, event: Event) -> Result<Value, PipelineError> {
        let result = self.forwarder.forward(&event).await?;
        Ok(GatewayResponse::ok_json(result).into())
    }
}

/// Passes the backend reply through unchanged.
#[derive(Clone)]
pub struct EventBridgeHandler {
    forwarder: Forwarder,
}

impl EventBridgeHandler {
    pub fn new(forwarder: Forwarder) -> Self {
        Self { forwarder }
    }
}

#[async_trait]
impl EventHandler for EventBridgeHandler {
    fn kind(&self) -> EventKind {
        EventKind::EventBridge
    }

    async fn handle(&self, event: Event) -> Result<Value, PipelineError> {
        self.forwarder.forward(&event).await
    }
}

/// Forwards each record of a queue batch as its own sub-event, in order.
///
/// The reply is always an empty `batchItemFailures` list: a failing record
/// aborts the whole batch with its error instead of being reported per item.
/// Per-record isolation only exists when `AsnBatchMiddleware` sits in front.
#[derive(Clone)]
pub struct SqsHandler {
    forwarder: Forwarder,
}

impl SqsHandler {
    pub fn new(forwarder: Forwarder) -> Self {
        Self { forwarder }
    }
}

#[async_trait]
impl EventHandler for SqsHandler {
    fn kind(&self) -> EventKind {
        EventKind::Sqs
    }

    async fn handle(&self, event: Event) -> Result<Value, PipelineError> {
        let records = event
            .payload()
            .get("Records")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        debug!(function = event.destination(), records = records.len(), "fanning out queue batch");
        for record in records {
            let sub_event = event.with_payload(record.clone());
            self.forwarder.forward(&sub_event).await?;
        }
        Ok(BatchResponse::default().into())
    }
}

/// Forwards the event as-is.
#[derive(Clone)]
pub struct DirectInvokeHandler {
    forwarder: Forwarder,
}

impl DirectInvokeHandler {
    pub fn new(forwarder: Forwarder) -> Self {
        Self { forwarder }
    }
}

#[async_trait]
impl EventHandler for DirectInvokeHandler {
    fn kind(&self) -> EventKind {
        EventKind::DirectInvoke
    }

    async fn handle(&self, event: Event) -> Result<Value, PipelineError> {
        self.forwarder.forward(&event).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
