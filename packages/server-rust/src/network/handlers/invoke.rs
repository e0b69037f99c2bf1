//! Event entry points: classify or tag the body, attach boundary context,
//! and run it through the event service.

use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};
use shim_core::{Event, EventKind};
use tower::ServiceExt;
use tracing::debug;
use uuid::Uuid;

use super::AppState;
use crate::network::middleware::REQUEST_ID_HEADER;
use crate::network::HealthState;
use crate::service::chain::common::API_KEY_CONTEXT_KEY;
use crate::service::classify;
use crate::service::PipelineError;

/// Header whose value is copied into `context.api_key`.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header naming the upstream system that produced the event.
pub const ORIGIN_HEADER: &str = "x-event-origin";

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let class = self.class();
        let body = Json(json!({
            "error": self.to_string(),
            "class": class.as_str(),
        }));
        (class.status_code(), body).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /invoke/{function}`: the kind is inferred from the body's shape.
pub async fn invoke_handler(
    State(state): State<AppState>,
    Path(function): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, PipelineError> {
    let payload = decode_body(&body)?;
    let kind = classify::identify(&payload);
    debug!(function = %function, kind = %kind, "classified inbound event");
    run_event(state, kind, function, &headers, payload).await
}

/// `POST /sqs/{function}`
pub async fn sqs_handler(
    State(state): State<AppState>,
    Path(function): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, PipelineError> {
    let payload = decode_body(&body)?;
    run_event(state, EventKind::Sqs, function, &headers, payload).await
}

/// `POST /eventbridge/{function}`
pub async fn eventbridge_handler(
    State(state): State<AppState>,
    Path(function): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, PipelineError> {
    let payload = decode_body(&body)?;
    run_event(state, EventKind::EventBridge, function, &headers, payload).await
}

/// `POST /api-gateway/{function}`
pub async fn api_gateway_handler(
    State(state): State<AppState>,
    Path(function): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, PipelineError> {
    let payload = decode_body(&body)?;
    run_event(state, EventKind::ApiGateway, function, &headers, payload).await
}

/// `POST /direct/{function}`
pub async fn direct_handler(
    State(state): State<AppState>,
    Path(function): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, PipelineError> {
    let payload = decode_body(&body)?;
    run_event(state, EventKind::DirectInvoke, function, &headers, payload).await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn run_event(
    state: AppState,
    kind: EventKind,
    function: String,
    headers: &HeaderMap,
    payload: Value,
) -> Result<Json<Value>, PipelineError> {
    // Counted before the state check so a drain starting now waits for us.
    let _guard = state.shutdown.in_flight_guard();
    if matches!(
        state.shutdown.health_state(),
        HealthState::Draining | HealthState::Stopped
    ) {
        return Err(PipelineError::ShuttingDown);
    }

    let mut event = Event::new(kind, function, payload).with_context(boundary_context(headers));
    if let Some(origin) = header_str(headers, ORIGIN_HEADER) {
        event = event.with_origin(origin);
    }

    let reply = state.events.oneshot(event).await?;
    Ok(Json(reply))
}

/// Empty (or all-whitespace) bodies decode to `{}`.
fn decode_body(body: &[u8]) -> Result<Value, PipelineError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_slice(body)
        .map_err(|e| PipelineError::InvalidPayload(format!("request body is not valid JSON: {e}")))
}

fn boundary_context(headers: &HeaderMap) -> Map<String, Value> {
    let mut context = Map::new();

    #[allow(clippy::cast_possible_truncation)]
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64);
    context.insert("timestamp".to_string(), json!(timestamp));

    let request_id = header_str(headers, REQUEST_ID_HEADER)
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
    context.insert("request_id".to_string(), Value::String(request_id));

    if let Some(key) = header_str(headers, API_KEY_HEADER) {
        context.insert(API_KEY_CONTEXT_KEY.to_string(), Value::String(key.to_string()));
    }
    context
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{HeaderValue, StatusCode};

    use super::*;
    use crate::network::handlers::tests::test_state;
    use crate::service::handlers::tests::RecordingTransport;
    use crate::service::ServerConfig;

    fn ready_state(transport: &Arc<RecordingTransport>, config: &ServerConfig) -> AppState {
        let state = test_state(transport, config);
        state.shutdown.set_ready();
        state
    }

    fn call(function: &str) -> Path<String> {
        Path(function.to_string())
    }

    #[tokio::test]
    async fn invoke_classifies_gateway_body() {
        let transport = Arc::new(RecordingTransport::replying(json!({"id": 1})));
        let state = ready_state(&transport, &ServerConfig::default());

        let Json(reply) = invoke_handler(
            State(state),
            call("test-function"),
            HeaderMap::new(),
            Bytes::from_static(br#"{"httpMethod": "GET", "path": "/x"}"#),
        )
        .await
        .unwrap();

        assert_eq!(reply["statusCode"], 200);
        assert_eq!(reply["body"], json!({"id": 1}));
    }

    #[tokio::test]
    async fn explicit_route_forces_kind_and_fills_context() {
        let transport = Arc::new(RecordingTransport::replying(json!({})));
        let state = ready_state(&transport, &ServerConfig::default());
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-42"));
        headers.insert(ORIGIN_HEADER, HeaderValue::from_static("billing"));

        let Json(reply) = sqs_handler(
            State(state),
            call("test-function"),
            headers,
            Bytes::from_static(br#"{"Records": [{"messageId": "m1", "body": {"n": 1}}]}"#),
        )
        .await
        .unwrap();

        assert_eq!(reply, json!({"batchItemFailures": []}));
        let calls = transport.calls.lock();
        assert_eq!(calls.len(), 1);
        let context = &calls[0].1["context"];
        assert_eq!(context["request_id"], "req-42");
        assert!(context["timestamp"].is_u64());
        assert!(context.get("api_key").is_none());
    }

    #[tokio::test]
    async fn missing_request_id_gets_a_fresh_uuid() {
        let context = boundary_context(&HeaderMap::new());
        let id = context["request_id"].as_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn api_key_header_reaches_auth() {
        let transport = Arc::new(RecordingTransport::replying(json!({"ok": true})));
        let config = ServerConfig {
            api_keys: ["k1".to_string()].into_iter().collect(),
            ..ServerConfig::default()
        };
        let state = ready_state(&transport, &config);

        let err = direct_handler(
            State(state.clone()),
            call("test-function"),
            HeaderMap::new(),
            Bytes::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Forbidden));

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, HeaderValue::from_static("k1"));
        let Json(reply) = direct_handler(State(state), call("test-function"), headers, Bytes::new())
            .await
            .unwrap();
        assert_eq!(reply, json!({"ok": true}));
    }

    #[tokio::test]
    async fn invalid_json_is_bad_input() {
        let transport = Arc::new(RecordingTransport::default());
        let state = ready_state(&transport, &ServerConfig::default());

        let err = eventbridge_handler(
            State(state),
            call("test-function"),
            HeaderMap::new(),
            Bytes::from_static(b"{nope"),
        )
        .await
        .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn unknown_function_is_404() {
        let transport = Arc::new(RecordingTransport::default());
        let state = ready_state(&transport, &ServerConfig::default());

        let err = api_gateway_handler(State(state), call("ghost"), HeaderMap::new(), Bytes::new())
            .await
            .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn draining_server_rejects_new_events() {
        let transport = Arc::new(RecordingTransport::default());
        let state = ready_state(&transport, &ServerConfig::default());
        state.shutdown.trigger_shutdown();

        let err = direct_handler(
            State(state.clone()),
            call("test-function"),
            HeaderMap::new(),
            Bytes::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(state.shutdown.in_flight_count(), 0);

        assert!(matches!(err, PipelineError::ShuttingDown));
        assert_eq!(
            err.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn empty_body_decodes_to_empty_object() {
        assert_eq!(decode_body(b"").unwrap(), json!({}));
        assert_eq!(decode_body(b"  \n").unwrap(), json!({}));
        assert_eq!(decode_body(b"[1]").unwrap(), json!([1]));
    }
}
