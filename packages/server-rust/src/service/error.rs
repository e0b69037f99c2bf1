//! Error types surfaced by the event pipeline.

use http::StatusCode;
use shim_core::EventKind;

/// Externally observable category of a [`PipelineError`].
///
/// The boundary maps each class to a distinct status so callers can tell an
/// unknown target from a bad request, an upstream failure, or a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    NotFound,
    BadInput,
    Upstream,
    Forbidden,
    Unavailable,
}

impl ErrorClass {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::NotFound => "not_found",
            ErrorClass::BadInput => "bad_input",
            ErrorClass::Upstream => "upstream",
            ErrorClass::Forbidden => "forbidden",
            ErrorClass::Unavailable => "unavailable",
        }
    }

    #[must_use]
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorClass::NotFound => StatusCode::NOT_FOUND,
            ErrorClass::BadInput => StatusCode::BAD_REQUEST,
            ErrorClass::Upstream => StatusCode::BAD_GATEWAY,
            ErrorClass::Forbidden => StatusCode::FORBIDDEN,
            ErrorClass::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Errors returned by middleware, the dispatcher, handlers and the transport.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    // Routing
    #[error("no handler registered for event kind {kind}")]
    NoHandler { kind: EventKind },
    #[error("no service registered for function {name}")]
    UnknownFunction { name: String },

    // Validation
    #[error("destination function name is required")]
    MissingDestination,
    #[error("missing required ASN fields: {}", .fields.join(", "))]
    MissingAsnFields { fields: Vec<String> },
    #[error("ASN must contain at least one item")]
    EmptyAsnItems,
    #[error("item {index} missing {field}")]
    AsnItemField { index: usize, field: &'static str },
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    // Outbound call
    #[error("call to {url} timed out after {timeout_ms}ms")]
    CallTimeout { url: String, timeout_ms: u64 },
    #[error("call to {url} returned status {status}")]
    UpstreamStatus { url: String, status: u16 },
    #[error("call to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Permission
    #[error("invalid API key")]
    Forbidden,

    // Availability
    #[error("too many events in flight, try again later")]
    Overloaded,
    #[error("server is shutting down")]
    ShuttingDown,
}

impl PipelineError {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::NoHandler { .. } | PipelineError::UnknownFunction { .. } => {
                ErrorClass::NotFound
            }
            PipelineError::MissingDestination
            | PipelineError::MissingAsnFields { .. }
            | PipelineError::EmptyAsnItems
            | PipelineError::AsnItemField { .. }
            | PipelineError::InvalidPayload(_) => ErrorClass::BadInput,
            PipelineError::CallTimeout { .. }
            | PipelineError::UpstreamStatus { .. }
            | PipelineError::Transport { .. } => ErrorClass::Upstream,
            PipelineError::Forbidden => ErrorClass::Forbidden,
            PipelineError::Overloaded | PipelineError::ShuttingDown => ErrorClass::Unavailable,
        }
    }
}
