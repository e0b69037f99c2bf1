//! Load shedding for the event engine.
//!
//! Rejects events with `PipelineError::Overloaded` once
//! `max_concurrent_events` are already in flight.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use serde_json::Value;
use shim_core::Event;
use tokio::sync::Semaphore;
use tower::{Layer, Service};
use tracing::warn;

use crate::service::error::PipelineError;

// ---------------------------------------------------------------------------
// LoadShedLayer
// ---------------------------------------------------------------------------

/// Tower layer that limits concurrent events via a semaphore.
///
/// When all permits are taken, incoming events are rejected immediately
/// rather than queued.
#[derive(Debug, Clone)]
pub struct LoadShedLayer {
    semaphore: Arc<Semaphore>,
}

impl LoadShedLayer {
    #[must_use]
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent as usize)),
        }
    }

    #[cfg(test)]
    fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl<S> Layer<S> for LoadShedLayer {
    type Service = LoadShedService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoadShedService {
            inner,
            semaphore: Arc::clone(&self.semaphore),
        }
    }
}

// ---------------------------------------------------------------------------
// LoadShedService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadShedService<S> {
    inner: S,
    semaphore: Arc<Semaphore>,
}

impl<S> Service<Event> for LoadShedService<S>
where
    S: Service<Event, Response = Value, Error = PipelineError> + Send,
    S::Future: Send + 'static,
{
    type Response = Value;
    type Error = PipelineError;
    type Future = Pin<Box<dyn Future<Output = Result<Value, PipelineError>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, event: Event) -> Self::Future {
        let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() else {
            warn!(function = event.destination(), "shedding event, too many in flight");
            return Box::pin(async { Err(PipelineError::Overloaded) });
        };

        let fut = self.inner.call(event);
        Box::pin(async move {
            let result = fut.await;
            drop(permit);
            result
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
