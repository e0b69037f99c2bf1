//! Event classification: infers an `EventKind` from the shape of a raw body.

use serde_json::Value;
use shim_core::{EventKind, QUEUE_EVENT_SOURCE};

/// Classifies a raw inbound body.
///
/// Rules are checked in a fixed order and the first match wins:
///
/// 1. `httpMethod` or `requestContext` present -> `ApiGateway`
/// 2. `detail-type` or `source` present -> `EventBridge`
/// 3. `Records[0].eventSource == "aws:sqs"` -> `Sqs`
/// 4. anything else -> `DirectInvoke`
///
/// A body carrying both `source` and an SQS `Records` list is therefore a bus
/// event. Non-object bodies always fall through to `DirectInvoke`.
#[must_use]
pub fn identify(raw: &Value) -> EventKind {
    let Some(body) = raw.as_object() else {
        return EventKind::DirectInvoke;
    };

    if body.contains_key("httpMethod") || body.contains_key("requestContext") {
        return EventKind::ApiGateway;
    }
    if body.contains_key("detail-type") || body.contains_key("source") {
        return EventKind::EventBridge;
    }

    let first_source = body
        .get("Records")
        .and_then(Value::as_array)
        .and_then(|records| records.first())
        .and_then(|record| record.get("eventSource"))
        .and_then(Value::as_str);
    if first_source == Some(QUEUE_EVENT_SOURCE) {
        return EventKind::Sqs;
    }

    EventKind::DirectInvoke
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
