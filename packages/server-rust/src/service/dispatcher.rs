//! Event dispatch: routes an `Event` to the handler registered for its kind.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use shim_core::{Event, EventKind};
use tracing::error;

use super::chain::Terminal;
use super::classify;
use super::error::PipelineError;
use super::handlers::{
    ApiGatewayHandler, DirectInvokeHandler, EventBridgeHandler, EventHandler, Forwarder,
    SqsHandler,
};

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Routes events to handlers by `EventKind`.
///
/// One handler per kind; registering a second handler for a kind replaces the
/// first. Events whose kind has no handler fail with
/// `PipelineError::NoHandler`.
pub struct Dispatcher {
    handlers: HashMap<EventKind, Arc<dyn EventHandler>>,
}

impl Dispatcher {
    /// Create a new dispatcher with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Create a dispatcher with the gateway, bus, queue, and direct handlers
    /// all sharing `forwarder`.
    #[must_use]
    pub fn with_default_handlers(forwarder: &Forwarder) -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(
            EventKind::ApiGateway,
            ApiGatewayHandler::new(forwarder.clone()),
        );
        dispatcher.register(
            EventKind::EventBridge,
            EventBridgeHandler::new(forwarder.clone()),
        );
        dispatcher.register(EventKind::Sqs, SqsHandler::new(forwarder.clone()));
        dispatcher.register(
            EventKind::DirectInvoke,
            DirectInvokeHandler::new(forwarder.clone()),
        );
        dispatcher
    }

    /// Register the handler for `kind`, replacing any previous one.
    pub fn register<H>(&mut self, kind: EventKind, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(kind, Arc::new(handler));
    }

    #[cfg(test)]
    fn handles(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Classify a raw inbound body. See [`classify::identify`].
    #[must_use]
    pub fn identify(raw: &Value) -> EventKind {
        classify::identify(raw)
    }

    /// Hand `event` to the handler for its kind and return its reply unchanged.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::NoHandler` if no handler is registered for the
    /// event's kind, or whatever error the handler returns.
    pub async fn dispatch(&self, event: Event) -> Result<Value, PipelineError> {
        let kind = event.kind();
        let Some(handler) = self.handlers.get(&kind) else {
            error!(kind = %kind, function = event.destination(), "no handler registered");
            return Err(PipelineError::NoHandler { kind });
        };
        handler.handle(event).await
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Terminal for Dispatcher {
    async fn call(&self, event: Event) -> Result<Value, PipelineError> {
        self.dispatch(event).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
