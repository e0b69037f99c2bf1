//! Outbound transport: posts forwarded events to backend endpoints.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::error::PipelineError;

/// Sends one JSON body to one URL and returns the decoded JSON reply.
///
/// Any status outside 2xx/3xx, a timeout, or an undecodable reply is an error.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, PipelineError>;
}

/// `reqwest`-backed transport with a bounded per-call timeout.
///
/// The inner client pools connections and is cheap to clone, so a single
/// instance is shared by every handler.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Builds a transport whose calls fail after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed
    /// (e.g., the system TLS backend fails to initialize).
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    fn map_error(&self, url: &str, source: reqwest::Error) -> PipelineError {
        if source.is_timeout() {
            PipelineError::CallTimeout {
                url: url.to_string(),
                timeout_ms: self.timeout_ms(),
            }
        } else {
            PipelineError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, PipelineError> {
        debug!(url, "forwarding event");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_error(url, e))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            warn!(url, status = status.as_u16(), "backend returned failure status");
            return Err(PipelineError::UpstreamStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| self.map_error(url, e))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
