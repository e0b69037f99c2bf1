//! Event model shared by every pipeline stage.
//!
//! An [`Event`] is treated as a value: stages that need a different payload or
//! context build a new `Event` through [`Event::with_payload`] /
//! [`Event::with_context`] instead of mutating the one they were handed.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Trigger-source category of an inbound event.
///
/// The set is closed: every event entering the pipeline is exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// HTTP gateway request (`httpMethod` / `requestContext` shaped).
    ApiGateway,
    /// Scheduled or bus event (`detail-type` / `source` shaped).
    #[serde(rename = "eventbridge")]
    EventBridge,
    /// Queue batch (`Records[*]` with an SQS `eventSource`).
    Sqs,
    /// Direct invocation with a free-form payload.
    DirectInvoke,
}

impl EventKind {
    /// All kinds, in classification priority order.
    pub const ALL: [EventKind; 4] = [
        EventKind::ApiGateway,
        EventKind::EventBridge,
        EventKind::Sqs,
        EventKind::DirectInvoke,
    ];

    /// Wire name of the kind, as used in logs and enrichment metadata.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ApiGateway => "api_gateway",
            EventKind::EventBridge => "eventbridge",
            EventKind::Sqs => "sqs",
            EventKind::DirectInvoke => "direct_invoke",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single event travelling through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    kind: EventKind,
    payload: Value,
    #[serde(default)]
    context: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    origin: Option<String>,
    destination: String,
}

impl Event {
    /// Creates an event with an empty context and no origin.
    pub fn new(kind: EventKind, destination: impl Into<String>, payload: Value) -> Self {
        Self {
            kind,
            payload,
            context: Map::new(),
            origin: None,
            destination: destination.into(),
        }
    }

    /// Replaces the context while building an event.
    #[must_use]
    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    /// Sets the origin identifier (e.g. a source ARN) while building an event.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Returns a new event carrying `payload` and everything else from `self`.
    #[must_use]
    pub fn with_payload(&self, payload: Value) -> Self {
        Self {
            kind: self.kind,
            payload,
            context: self.context.clone(),
            origin: self.origin.clone(),
            destination: self.destination.clone(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    #[must_use]
    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Looks up a single context entry.
    #[must_use]
    pub fn context_value(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    #[must_use]
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Logical function name the event is routed to.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// `true` for `null`, `{}`, `[]` and `""` payloads.
    #[must_use]
    pub fn has_empty_payload(&self) -> bool {
        match &self.payload {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::String(s) => s.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }
}
