//! Ordered middleware chain wrapped around a terminal action.
//!
//! - [`common`]: logging, destination validation, API-key auth
//! - [`asn`]: validation, enrichment and batch isolation for shipment notices
//!
//! Steps run strictly in the order they were added. Each step receives a
//! [`Next`] cursor over the remaining steps and decides whether to call it
//! (once, several times, or not at all). An error returned by any step stops
//! the chain and propagates to the caller of [`MiddlewareChain::execute`].

pub mod asn;
pub mod common;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use shim_core::Event;

use super::error::PipelineError;

pub use asn::{AsnBatchMiddleware, AsnEnrichmentMiddleware, AsnValidationMiddleware};
pub use common::{AuthMiddleware, LoggingMiddleware, ValidationMiddleware};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A single processing step.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Process `event`, usually by calling `next.run(event)` somewhere.
    async fn process(&self, event: Event, next: Next<'_>) -> Result<Value, PipelineError>;
}

/// The action run once every middleware has passed the event on.
#[async_trait]
pub trait Terminal: Send + Sync {
    async fn call(&self, event: Event) -> Result<Value, PipelineError>;
}

// ---------------------------------------------------------------------------
// Next
// ---------------------------------------------------------------------------

/// Continuation representing the rest of the chain.
///
/// `Copy`, so a step may invoke the remainder more than once (batch isolation
/// runs it once per chunk).
#[derive(Clone, Copy)]
pub struct Next<'a> {
    remaining: &'a [Arc<dyn Middleware>],
    terminal: &'a dyn Terminal,
}

impl<'a> Next<'a> {
    /// Runs the remaining steps and then the terminal action.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by a remaining step or the terminal.
    pub async fn run(self, event: Event) -> Result<Value, PipelineError> {
        match self.remaining.split_first() {
            Some((step, rest)) => {
                let next = Next {
                    remaining: rest,
                    terminal: self.terminal,
                };
                step.process(event, next).await
            }
            None => self.terminal.call(event).await,
        }
    }

    /// Number of middleware steps still ahead of the terminal action.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

// ---------------------------------------------------------------------------
// MiddlewareChain
// ---------------------------------------------------------------------------

/// An ordered list of middleware.
///
/// There is no priority or dependency resolution between steps; composing
/// them in a sensible order is up to the integrator.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    steps: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    #[must_use]
    pub fn new(steps: Vec<Arc<dyn Middleware>>) -> Self {
        Self { steps }
    }

    /// Appends a step to the end of the chain.
    pub fn add<M: Middleware + 'static>(&mut self, step: M) {
        self.steps.push(Arc::new(step));
    }

    /// Builder-style [`add`](Self::add).
    #[must_use]
    pub fn with<M: Middleware + 'static>(mut self, step: M) -> Self {
        self.add(step);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step names in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Runs `event` through every step and finally through `terminal`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a step or by the terminal action.
    pub async fn execute(
        &self,
        event: Event,
        terminal: &dyn Terminal,
    ) -> Result<Value, PipelineError> {
        Next {
            remaining: &self.steps,
            terminal,
        }
        .run(event)
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
