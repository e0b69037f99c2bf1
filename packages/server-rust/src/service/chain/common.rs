//! Generic middleware usable with any event kind.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;
use shim_core::Event;
use tracing::{error, info, warn};

use super::{Middleware, Next};
use crate::service::error::PipelineError;

// ---------------------------------------------------------------------------
// LoggingMiddleware
// ---------------------------------------------------------------------------

/// Logs entry, success and failure. Never swallows errors.
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn process(&self, event: Event, next: Next<'_>) -> Result<Value, PipelineError> {
        let kind = event.kind();
        let function = event.destination().to_string();
        info!(kind = %kind, function = %function, "processing event");

        match next.run(event).await {
            Ok(response) => {
                info!(kind = %kind, function = %function, "event processed");
                Ok(response)
            }
            Err(e) => {
                error!(kind = %kind, function = %function, error = %e, "event failed");
                Err(e)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ValidationMiddleware
// ---------------------------------------------------------------------------

/// Rejects events without a destination; warns about empty payloads.
#[derive(Debug, Clone, Default)]
pub struct ValidationMiddleware;

#[async_trait]
impl Middleware for ValidationMiddleware {
    fn name(&self) -> &'static str {
        "validation"
    }

    async fn process(&self, event: Event, next: Next<'_>) -> Result<Value, PipelineError> {
        if event.destination().is_empty() {
            return Err(PipelineError::MissingDestination);
        }
        if event.has_empty_payload() {
            warn!(function = event.destination(), "empty payload");
        }
        next.run(event).await
    }
}

// ---------------------------------------------------------------------------
// AuthMiddleware
// ---------------------------------------------------------------------------

/// Context key carrying the caller's API key.
pub const API_KEY_CONTEXT_KEY: &str = "api_key";

/// Requires `context.api_key` to match one of the configured keys.
///
/// With no keys configured every event passes through untouched.
#[derive(Debug, Clone, Default)]
pub struct AuthMiddleware {
    api_keys: BTreeSet<String>,
}

impl AuthMiddleware {
    pub fn new<I, S>(api_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            api_keys: api_keys.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn process(&self, event: Event, next: Next<'_>) -> Result<Value, PipelineError> {
        if !self.is_enabled() {
            return next.run(event).await;
        }

        let presented = event
            .context_value(API_KEY_CONTEXT_KEY)
            .and_then(Value::as_str);
        match presented {
            Some(key) if self.api_keys.contains(key) => next.run(event).await,
            _ => {
                warn!(function = event.destination(), "rejected invalid API key");
                Err(PipelineError::Forbidden)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
