//! Network location of a backend function inside the cluster.

use serde::{Deserialize, Serialize};

/// DNS suffix appended to `{service}.{namespace}` for in-cluster addresses.
pub const CLUSTER_DOMAIN: &str = "svc.cluster.local";

/// Namespace used when a descriptor does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Port used when a descriptor does not name one.
pub const DEFAULT_PORT: u16 = 80;

/// Path used when a descriptor does not name one.
pub const DEFAULT_PATH: &str = "/";

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

/// Resolved endpoint for a logical function name.
///
/// Only `service_name` is required; deserialization fills the remaining fields
/// with their defaults, so a config entry of `{"service_name": "x"}` resolves
/// to `http://x.default.svc.cluster.local:80/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointDescriptor {
    #[serde(default = "default_namespace")]
    namespace: String,
    service_name: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_path")]
    path: String,
}

impl EndpointDescriptor {
    /// Creates a descriptor for `service_name` with default namespace, port and path.
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            namespace: default_namespace(),
            service_name: service_name.into(),
            port: DEFAULT_PORT,
            path: default_path(),
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fully qualified in-cluster URL of the endpoint.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "http://{}.{}.{}:{}{}",
            self.service_name, self.namespace, CLUSTER_DOMAIN, self.port, self.path
        )
    }
}
