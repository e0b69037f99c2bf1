//! Source-appropriate response envelopes.
//!
//! Bus and direct-invoke replies pass the backend body through untouched and
//! have no envelope type of their own.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Reply shape expected by an HTTP gateway integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResponse {
    pub status_code: u16,
    pub body: Value,
    pub headers: BTreeMap<String, String>,
}

impl GatewayResponse {
    /// A `200` reply carrying `body` as JSON.
    #[must_use]
    pub fn ok_json(body: Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            status_code: 200,
            body,
            headers,
        }
    }
}

/// One record the queue should redeliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemFailure {
    /// The record's `messageId`; `None` when the record carried none.
    pub item_identifier: Option<String>,
}

/// Partial-batch reply for queue-sourced events. An empty list means every
/// record succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub batch_item_failures: Vec<BatchItemFailure>,
}

impl BatchResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.batch_item_failures.is_empty()
    }
}

impl From<GatewayResponse> for Value {
    fn from(response: GatewayResponse) -> Self {
        let headers = response
            .headers
            .into_iter()
            .map(|(name, value)| (name, Value::String(value)))
            .collect::<Map<String, Value>>();
        json!({
            "statusCode": response.status_code,
            "body": response.body,
            "headers": headers,
        })
    }
}

impl From<BatchItemFailure> for Value {
    fn from(failure: BatchItemFailure) -> Self {
        json!({ "itemIdentifier": failure.item_identifier })
    }
}

impl From<BatchResponse> for Value {
    fn from(response: BatchResponse) -> Self {
        let failures = response
            .batch_item_failures
            .into_iter()
            .map(Value::from)
            .collect::<Vec<_>>();
        json!({ "batchItemFailures": failures })
    }
}
