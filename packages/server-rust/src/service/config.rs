use std::collections::{BTreeSet, HashSet};

use serde::Deserialize;
use shim_core::EndpointDescriptor;

/// Server-level configuration for the event pipeline.
///
/// Controls outbound call timeouts, concurrency limits, and batch sizing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Upper bound on a single outbound backend call, in milliseconds.
    pub call_timeout_ms: u64,
    /// Maximum number of events processed concurrently before load shedding.
    pub max_concurrent_events: u32,
    /// Chunk size used by the ASN batch-isolation step.
    pub batch_size: usize,
    /// Accepted API keys. Empty disables the auth step.
    pub api_keys: BTreeSet<String>,
    /// Append ASN validation, enrichment and batch isolation to the standard chain.
    pub asn_pipeline: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 30_000,
            max_concurrent_events: 1000,
            batch_size: 100,
            api_keys: BTreeSet::new(),
            asn_pipeline: false,
        }
    }
}

/// One backend function entry as it appears in a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    pub namespace: String,
    pub service_name: String,
    pub port: u16,
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String {
    "/".to_string()
}

impl ServiceEntry {
    #[must_use]
    pub fn to_descriptor(&self) -> EndpointDescriptor {
        EndpointDescriptor::new(self.service_name.as_str())
            .with_namespace(self.namespace.as_str())
            .with_port(self.port)
            .with_path(self.path.as_str())
    }
}

/// Whole configuration document: registered services plus pipeline settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShimConfig {
    #[serde(default)]
    pub services: Vec<ServiceEntry>,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Errors from loading or checking configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

impl ShimConfig {
    /// Parses a configuration document from an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Malformed` if required entry fields are missing
    /// or have the wrong type.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Parses a configuration document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Malformed` on invalid JSON or a shape mismatch.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Checks entries for problems serde cannot express. Reports all of them.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` listing every problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();

        for (idx, entry) in self.services.iter().enumerate() {
            if entry.name.trim().is_empty() {
                problems.push(format!("service {idx}: empty 'name'"));
            }
            if entry.service_name.trim().is_empty() {
                problems.push(format!("service {idx}: empty 'service_name'"));
            }
            if entry.namespace.trim().is_empty() {
                problems.push(format!("service {idx}: empty 'namespace'"));
            }
            if entry.port == 0 {
                problems.push(format!("service {idx}: 'port' must be non-zero"));
            }
            if !entry.path.starts_with('/') {
                problems.push(format!("service {idx}: 'path' must start with '/'"));
            }
            if !seen.insert(entry.name.as_str()) {
                problems.push(format!("service {idx}: duplicate name '{}'", entry.name));
            }
        }
        if self.server.batch_size == 0 {
            problems.push("server: 'batch_size' must be non-zero".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.call_timeout_ms, 30_000);
        assert_eq!(config.max_concurrent_events, 1000);
        assert_eq!(config.batch_size, 100);
        assert!(config.api_keys.is_empty());
        assert!(!config.asn_pipeline);
    }

    #[test]
    fn parses_document_with_optional_path() {
        let config = ShimConfig::from_value(json!({
            "services": [
                {"name": "my-function", "namespace": "default", "service_name": "my-service", "port": 8080, "path": "/invoke"},
                {"name": "other", "namespace": "ns", "service_name": "other-svc", "port": 9000}
            ],
            "server": {"call_timeout_ms": 5000}
        }))
        .unwrap();

        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services[1].path, "/");
        assert_eq!(config.server.call_timeout_ms, 5000);
        assert_eq!(config.server.batch_size, 100);
        assert_eq!(
            config.services[0].to_descriptor().url(),
            "http://my-service.default.svc.cluster.local:8080/invoke"
        );
        config.validate().unwrap();
    }

    #[test]
    fn missing_required_entry_field_is_malformed() {
        let err = ShimConfig::from_value(json!({
            "services": [{"name": "f", "service_name": "s", "port": 80}]
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }

    #[test]
    fn from_json_parses_text_and_api_keys() {
        let config = ShimConfig::from_json(
            r#"{"services": [], "server": {"api_keys": ["k2", "k1", "k1"]}}"#,
        )
        .unwrap();
        assert_eq!(
            config.server.api_keys.iter().collect::<Vec<_>>(),
            vec!["k1", "k2"]
        );

        assert!(matches!(
            ShimConfig::from_json("services:"),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn validate_reports_every_problem() {
        let config = ShimConfig::from_value(json!({
            "services": [
                {"name": "a", "namespace": "ns", "service_name": "", "port": 0},
                {"name": "a", "namespace": "ns", "service_name": "s", "port": 80, "path": "nope"}
            ]
        }))
        .unwrap();

        let ConfigError::Invalid(problems) = config.validate().unwrap_err() else {
            panic!("expected Invalid");
        };
        assert_eq!(problems.len(), 4);
        assert!(problems.iter().any(|p| p.contains("duplicate name 'a'")));
    }
}
