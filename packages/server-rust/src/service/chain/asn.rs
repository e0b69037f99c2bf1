//! Middleware for advance shipping notice (ASN) payloads.
//!
//! Intended order: [`AsnValidationMiddleware`], then
//! [`AsnEnrichmentMiddleware`], then [`AsnBatchMiddleware`].
//!
//! An ASN looks like:
//!
//! ```json
//! {
//!   "shipment_number": "SH-2025-001",
//!   "carrier": "FEDEX",
//!   "ship_to_address": "123 Factory St, Detroit, MI",
//!   "delivery_date": "2025-11-28",
//!   "items": [{"part_number": "BRK-1234-A", "quantity": 100}]
//! }
//! ```
//!
//! Queue events carry one ASN per record, in `Records[*].body`.

use std::borrow::Cow;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use shim_core::envelope::{BatchItemFailure, BatchResponse};
use shim_core::{Event, EventKind};
use tracing::{debug, error, info};

use super::{Middleware, Next};
use crate::service::error::PipelineError;

/// Top-level fields every ASN must carry.
pub const REQUIRED_FIELDS: [&str; 5] = [
    "shipment_number",
    "carrier",
    "ship_to_address",
    "delivery_date",
    "items",
];

/// Fields every ASN line item must carry.
pub const REQUIRED_ITEM_FIELDS: [&str; 2] = ["part_number", "quantity"];

/// Default number of records per chunk in [`AsnBatchMiddleware`].
pub const DEFAULT_BATCH_SIZE: usize = 100;

fn records(payload: &Value) -> &[Value] {
    payload
        .get("Records")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// AsnValidationMiddleware
// ---------------------------------------------------------------------------

/// Rejects ASNs with missing fields, no items, or incomplete items.
#[derive(Debug, Clone, Default)]
pub struct AsnValidationMiddleware;

impl AsnValidationMiddleware {
    /// Validates a single ASN document.
    ///
    /// # Errors
    ///
    /// - `MissingAsnFields` naming every absent top-level field (sorted)
    /// - `EmptyAsnItems` if `items` is empty or not a list
    /// - `AsnItemField` for the first item missing a required field
    pub fn validate_asn(asn: &Value) -> Result<(), PipelineError> {
        let empty = Map::new();
        let fields = asn.as_object().unwrap_or(&empty);

        let mut missing: Vec<String> = REQUIRED_FIELDS
            .into_iter()
            .filter(|field| !fields.contains_key(*field))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(PipelineError::MissingAsnFields { fields: missing });
        }

        let items = match fields.get("items").and_then(Value::as_array) {
            Some(items) if !items.is_empty() => items,
            _ => return Err(PipelineError::EmptyAsnItems),
        };

        for (index, item) in items.iter().enumerate() {
            for field in REQUIRED_ITEM_FIELDS {
                if item.get(field).is_none() {
                    return Err(PipelineError::AsnItemField { index, field });
                }
            }
        }
        Ok(())
    }

    /// Returns a record's ASN body, decoding it when it arrives as a JSON string.
    fn record_body(record: &Value) -> Result<Cow<'_, Value>, PipelineError> {
        match record.get("body") {
            None => Ok(Cow::Owned(Value::Object(Map::new()))),
            Some(Value::String(raw)) => serde_json::from_str(raw).map(Cow::Owned).map_err(|e| {
                let id = record
                    .get("messageId")
                    .and_then(Value::as_str)
                    .unwrap_or("<unknown>");
                PipelineError::InvalidPayload(format!("record {id} body is not valid JSON: {e}"))
            }),
            Some(body) => Ok(Cow::Borrowed(body)),
        }
    }
}

#[async_trait]
impl Middleware for AsnValidationMiddleware {
    fn name(&self) -> &'static str {
        "asn_validation"
    }

    async fn process(&self, event: Event, next: Next<'_>) -> Result<Value, PipelineError> {
        if event.kind() == EventKind::Sqs {
            for record in records(event.payload()) {
                let body = Self::record_body(record)?;
                Self::validate_asn(&body)?;
            }
        } else {
            Self::validate_asn(event.payload())?;
        }
        next.run(event).await
    }
}

// ---------------------------------------------------------------------------
// AsnEnrichmentMiddleware
// ---------------------------------------------------------------------------

/// Adds a `metadata` block and, when absent, a `tracking_number`.
///
/// The incoming event is left untouched; a rebuilt event is passed on.
/// Payloads that are not JSON objects are passed on unchanged.
#[derive(Debug, Clone, Default)]
pub struct AsnEnrichmentMiddleware;

impl AsnEnrichmentMiddleware {
    /// Tracking number synthesized from the shipment number.
    #[must_use]
    pub fn tracking_number(asn: &Map<String, Value>) -> String {
        match asn.get("shipment_number") {
            Some(Value::String(number)) => format!("TRK-{number}"),
            Some(Value::Null) | None => "TRK-UNKNOWN".to_string(),
            Some(other) => format!("TRK-{other}"),
        }
    }

    fn enrich(event: &Event) -> Option<Event> {
        let mut payload = event.payload().as_object()?.clone();

        payload.insert(
            "metadata".to_string(),
            json!({
                "processed_at": event.context_value("timestamp").cloned().unwrap_or(Value::Null),
                "source": event.kind().as_str(),
                "function_name": event.destination(),
            }),
        );
        if !payload.contains_key("tracking_number") {
            let tracking = Self::tracking_number(&payload);
            payload.insert("tracking_number".to_string(), Value::String(tracking));
        }

        Some(event.with_payload(Value::Object(payload)))
    }
}

#[async_trait]
impl Middleware for AsnEnrichmentMiddleware {
    fn name(&self) -> &'static str {
        "asn_enrichment"
    }

    async fn process(&self, event: Event, next: Next<'_>) -> Result<Value, PipelineError> {
        match Self::enrich(&event) {
            Some(enriched) => next.run(enriched).await,
            None => {
                debug!(function = event.destination(), "non-object payload, skipping enrichment");
                next.run(event).await
            }
        }
    }
}

// ---------------------------------------------------------------------------
// AsnBatchMiddleware
// ---------------------------------------------------------------------------

/// Splits queue batches into fixed-size chunks and isolates chunk failures.
///
/// Each chunk runs through the rest of the chain as its own queue event. When
/// a chunk fails, every record in it is reported in `batchItemFailures` and
/// the remaining chunks still run. Non-queue events pass straight through.
#[derive(Debug, Clone)]
pub struct AsnBatchMiddleware {
    batch_size: usize,
}

impl AsnBatchMiddleware {
    /// A `batch_size` of 0 is treated as 1.
    #[must_use]
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl Default for AsnBatchMiddleware {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

#[async_trait]
impl Middleware for AsnBatchMiddleware {
    fn name(&self) -> &'static str {
        "asn_batch"
    }

    async fn process(&self, event: Event, next: Next<'_>) -> Result<Value, PipelineError> {
        if event.kind() != EventKind::Sqs {
            return next.run(event).await;
        }

        let records = records(event.payload());
        info!(
            function = event.destination(),
            records = records.len(),
            batch_size = self.batch_size,
            "processing ASN batch"
        );

        let mut response = BatchResponse::default();
        for (index, chunk) in records.chunks(self.batch_size).enumerate() {
            let chunk_number = index + 1;
            let chunk_event = event.with_payload(json!({ "Records": chunk }));

            match next.run(chunk_event).await {
                Ok(_) => info!(chunk = chunk_number, "chunk processed"),
                Err(e) => {
                    error!(chunk = chunk_number, error = %e, "chunk failed");
                    response
                        .batch_item_failures
                        .extend(chunk.iter().map(|record| BatchItemFailure {
                            item_identifier: record
                                .get("messageId")
                                .and_then(Value::as_str)
                                .map(str::to_string),
                        }));
                }
            }
        }

        Ok(response.into())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
