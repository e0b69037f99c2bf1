use std::collections::HashMap;

use dashmap::DashMap;
use shim_core::EndpointDescriptor;
use tracing::{debug, info};

use super::config::ServiceEntry;

// ---------------------------------------------------------------------------
// EndpointRegistry
// ---------------------------------------------------------------------------

/// Maps logical function names to the endpoint that serves them.
///
/// Entries are normally loaded once at startup. The map is internally
/// synchronized, so `register` during live traffic is also safe: readers see
/// either the old or the new descriptor, never a torn one.
pub struct EndpointRegistry {
    endpoints: DashMap<String, EndpointDescriptor>,
}

impl EndpointRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            endpoints: DashMap::new(),
        }
    }

    /// Builds a registry from configuration entries.
    #[must_use]
    pub fn from_entries(entries: &[ServiceEntry]) -> Self {
        let registry = Self::new();
        registry.load_entries(entries);
        registry
    }

    /// Registers `descriptor` under `name`, replacing any previous mapping.
    pub fn register(&self, name: impl Into<String>, descriptor: EndpointDescriptor) {
        let name = name.into();
        debug!(function = %name, url = %descriptor.url(), "registering endpoint");
        self.endpoints.insert(name, descriptor);
    }

    /// Returns the descriptor registered for `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<EndpointDescriptor> {
        self.endpoints.get(name).map(|entry| entry.value().clone())
    }

    /// Bulk-registers a name -> descriptor map. Descriptor defaults have
    /// already been applied when the map was deserialized.
    pub fn load(&self, config: HashMap<String, EndpointDescriptor>) {
        for (name, descriptor) in config {
            self.register(name, descriptor);
        }
    }

    /// Bulk-registers list-shaped configuration entries.
    pub fn load_entries(&self, entries: &[ServiceEntry]) {
        for entry in entries {
            self.register(entry.name.as_str(), entry.to_descriptor());
            info!(
                function = %entry.name,
                namespace = %entry.namespace,
                service = %entry.service_name,
                port = entry.port,
                "registered service"
            );
        }
    }

    /// Snapshot of all registrations, sorted by function name.
    pub fn entries(&self) -> Vec<(String, EndpointDescriptor)> {
        let mut entries: Vec<_> = self
            .endpoints
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
