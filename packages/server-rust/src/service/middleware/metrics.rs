//! Per-event timing and outcome, recorded on `tracing` spans.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use serde_json::Value;
use shim_core::Event;
use tower::{Layer, Service};
use tracing::{info_span, Instrument};

use crate::service::error::PipelineError;

// ---------------------------------------------------------------------------
// EventMetricsLayer
// ---------------------------------------------------------------------------

/// Tower layer that wraps each event in an `event` span and logs its outcome.
#[derive(Debug, Clone)]
pub struct EventMetricsLayer;

impl<S> Layer<S> for EventMetricsLayer {
    type Service = EventMetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        EventMetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// EventMetricsService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EventMetricsService<S> {
    inner: S,
}

impl<S> Service<Event> for EventMetricsService<S>
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
        let kind = event.kind().as_str();
        let function = event.destination().to_string();

        let span = info_span!(
            "event",
            kind = kind,
            function = %function,
            duration_ms = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        let fut = self.inner.call(event);

        Box::pin(
            async move {
                let start = Instant::now();
                let result = fut.await;

                #[allow(clippy::cast_possible_truncation)]
                let duration_ms = start.elapsed().as_millis() as u64;
                let outcome = match &result {
                    Ok(_) => "ok",
                    Err(e) => e.class().as_str(),
                };

                tracing::Span::current().record("duration_ms", duration_ms);
                tracing::Span::current().record("outcome", outcome);
                tracing::info!(
                    kind = kind,
                    function = %function,
                    duration_ms = duration_ms,
                    outcome = outcome,
                    "event complete"
                );

                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
