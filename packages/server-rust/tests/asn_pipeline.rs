//! End-to-end ASN flow: full middleware chain over the real dispatcher and
//! queue handler, with only the outbound transport stubbed.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use shim_core::{EndpointDescriptor, Event, EventKind};
use shim_server::service::chain::{
    AsnBatchMiddleware, AsnEnrichmentMiddleware, AsnValidationMiddleware, LoggingMiddleware,
    ValidationMiddleware,
};
use shim_server::service::{EndpointRegistry, PipelineError, ShimEngine, Transport};

/// Records forwarded bodies; fails every call when `fail` is set.
#[derive(Default)]
struct StubTransport {
    fail: bool,
    calls: Mutex<Vec<(String, Value)>>,
}

#[async_trait]
impl Transport for StubTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, PipelineError> {
        self.calls.lock().push((url.to_string(), body.clone()));
        if self.fail {
            return Err(PipelineError::UpstreamStatus {
                url: url.to_string(),
                status: 503,
            });
        }
        Ok(json!({"accepted": true}))
    }
}

fn asn(shipment: &str) -> Value {
    json!({
        "shipment_number": shipment,
        "carrier": "FEDEX",
        "ship_to_address": "123 Factory St, Detroit, MI",
        "delivery_date": "2025-11-28",
        "items": [
            {"part_number": "BRK-1234-A", "quantity": 100},
            {"part_number": "BRK-5678-B", "quantity": 50}
        ]
    })
}

fn queue_event() -> Event {
    Event::new(
        EventKind::Sqs,
        "asn-processor",
        json!({"Records": [
            {"messageId": "msg-001", "body": asn("SH-2025-001")},
            {"messageId": "msg-002", "body": asn("SH-2025-002")}
        ]}),
    )
}

fn engine(transport: &Arc<StubTransport>) -> ShimEngine {
    let registry = Arc::new(EndpointRegistry::new());
    registry.register(
        "asn-processor",
        EndpointDescriptor::new("asn-service")
            .with_namespace("logistics")
            .with_port(8080)
            .with_path("/process"),
    );

    ShimEngine::builder(registry, Arc::clone(transport) as Arc<dyn Transport>)
        .middleware(LoggingMiddleware)
        .middleware(ValidationMiddleware)
        .middleware(AsnValidationMiddleware)
        .middleware(AsnEnrichmentMiddleware)
        .middleware(AsnBatchMiddleware::new(50))
        .build()
}

#[tokio::test]
async fn successful_batch_reports_no_failures() {
    let transport = Arc::new(StubTransport::default());
    let reply = engine(&transport).invoke(queue_event()).await.unwrap();

    assert_eq!(reply, json!({"batchItemFailures": []}));

    let calls = transport.calls.lock();
    assert_eq!(calls.len(), 2);
    for (url, _) in calls.iter() {
        assert_eq!(url, "http://asn-service.logistics.svc.cluster.local:8080/process");
    }
    assert_eq!(calls[0].1["event"]["body"]["shipment_number"], "SH-2025-001");
    assert_eq!(calls[1].1["event"]["messageId"], "msg-002");
}

#[tokio::test]
async fn failing_chunk_reports_every_record_in_it() {
    let transport = Arc::new(StubTransport {
        fail: true,
        ..StubTransport::default()
    });
    let reply = engine(&transport).invoke(queue_event()).await.unwrap();

    assert_eq!(
        reply,
        json!({"batchItemFailures": [
            {"itemIdentifier": "msg-001"},
            {"itemIdentifier": "msg-002"}
        ]})
    );
    // The queue handler stops at the first failing record.
    assert_eq!(transport.calls.lock().len(), 1);
}

#[tokio::test]
async fn invalid_asn_is_rejected_before_any_call() {
    let transport = Arc::new(StubTransport::default());
    let mut bad = asn("SH-X");
    bad["items"] = json!([]);
    let event = Event::new(
        EventKind::Sqs,
        "asn-processor",
        json!({"Records": [{"messageId": "msg-009", "body": bad}]}),
    );

    let err = engine(&transport).invoke(event).await.unwrap_err();

    assert_eq!(err.to_string(), "ASN must contain at least one item");
    assert!(transport.calls.lock().is_empty());
}

#[tokio::test]
async fn direct_asn_is_enriched_before_forwarding() {
    let transport = Arc::new(StubTransport::default());
    let event = Event::new(EventKind::DirectInvoke, "asn-processor", asn("SH-2025-003"));

    let reply = engine(&transport).invoke(event).await.unwrap();
    assert_eq!(reply, json!({"accepted": true}));

    let calls = transport.calls.lock();
    let forwarded = &calls[0].1["event"];
    assert_eq!(forwarded["tracking_number"], "TRK-SH-2025-003");
    assert_eq!(forwarded["metadata"]["source"], "direct_invoke");
    assert_eq!(forwarded["metadata"]["function_name"], "asn-processor");
}
