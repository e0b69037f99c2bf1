//! Composition root: registry, dispatcher and middleware chain wired together.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde_json::Value;
use shim_core::{Event, EventKind};
use tower::Service;
use tracing::info;

use super::chain::{
    AsnBatchMiddleware, AsnEnrichmentMiddleware, AsnValidationMiddleware, AuthMiddleware,
    LoggingMiddleware, Middleware, MiddlewareChain, ValidationMiddleware,
};
use super::config::ServerConfig;
use super::dispatcher::Dispatcher;
use super::error::PipelineError;
use super::handlers::{EventHandler, Forwarder};
use super::registry::EndpointRegistry;
use super::transport::Transport;

// ---------------------------------------------------------------------------
// ShimEngine
// ---------------------------------------------------------------------------

/// Runs events through the middleware chain and dispatches them to handlers.
///
/// Cheap to clone; all state sits behind `Arc`s and is read-only once built.
#[derive(Clone)]
pub struct ShimEngine {
    registry: Arc<EndpointRegistry>,
    dispatcher: Arc<Dispatcher>,
    chain: Arc<MiddlewareChain>,
}

impl ShimEngine {
    /// Starts a builder with the four default handlers sharing one forwarder.
    #[must_use]
    pub fn builder(
        registry: Arc<EndpointRegistry>,
        transport: Arc<dyn Transport>,
    ) -> ShimEngineBuilder {
        let forwarder = Forwarder::new(Arc::clone(&registry), transport);
        ShimEngineBuilder {
            dispatcher: Dispatcher::with_default_handlers(&forwarder),
            registry,
            chain: MiddlewareChain::default(),
        }
    }

    /// Engine with the standard chain: logging, validation, auth when
    /// `config.api_keys` is non-empty, then the ASN steps when
    /// `config.asn_pipeline` is set.
    #[must_use]
    pub fn standard(
        registry: Arc<EndpointRegistry>,
        transport: Arc<dyn Transport>,
        config: &ServerConfig,
    ) -> Self {
        let mut builder = Self::builder(registry, transport)
            .middleware(LoggingMiddleware)
            .middleware(ValidationMiddleware);
        if !config.api_keys.is_empty() {
            builder = builder.middleware(AuthMiddleware::new(config.api_keys.iter().cloned()));
        }
        if config.asn_pipeline {
            builder = builder
                .middleware(AsnValidationMiddleware)
                .middleware(AsnEnrichmentMiddleware)
                .middleware(AsnBatchMiddleware::new(config.batch_size));
        }
        builder.build()
    }

    /// Runs `event` through the chain, with the dispatcher as terminal action.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a middleware step, the dispatcher, or
    /// the selected handler.
    pub async fn invoke(&self, event: Event) -> Result<Value, PipelineError> {
        self.chain.execute(event, self.dispatcher.as_ref()).await
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn chain(&self) -> &MiddlewareChain {
        &self.chain
    }
}

impl Service<Event> for ShimEngine {
    type Response = Value;
    type Error = PipelineError;
    type Future = Pin<Box<dyn Future<Output = Result<Value, PipelineError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, event: Event) -> Self::Future {
        let engine = self.clone();
        Box::pin(async move { engine.invoke(event).await })
    }
}

// ---------------------------------------------------------------------------
// ShimEngineBuilder
// ---------------------------------------------------------------------------

/// Builder returned by [`ShimEngine::builder`].
pub struct ShimEngineBuilder {
    registry: Arc<EndpointRegistry>,
    dispatcher: Dispatcher,
    chain: MiddlewareChain,
}

impl ShimEngineBuilder {
    /// Appends a middleware step; steps run in the order they are added.
    #[must_use]
    pub fn middleware<M: Middleware + 'static>(mut self, step: M) -> Self {
        self.chain.add(step);
        self
    }

    /// Replaces the handler for `kind`.
    #[must_use]
    pub fn handler<H: EventHandler + 'static>(mut self, kind: EventKind, handler: H) -> Self {
        self.dispatcher.register(kind, handler);
        self
    }

    #[must_use]
    pub fn build(self) -> ShimEngine {
        info!(
            services = self.registry.len(),
            middleware = ?self.chain.names(),
            "event engine ready"
        );
        ShimEngine {
            registry: self.registry,
            dispatcher: Arc::new(self.dispatcher),
            chain: Arc::new(self.chain),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
