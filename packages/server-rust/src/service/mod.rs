//! Event processing framework.
//!
//! An inbound event flows through:
//!
//! 1. **Classification** (`classify`): raw body -> `EventKind`
//! 2. **Tower layers** (`middleware`): load shedding, timing
//! 3. **Middleware chain** (`chain`): logging, validation, auth, ASN steps
//! 4. **Dispatch** (`dispatcher`): `EventKind` -> handler
//! 5. **Handlers** (`handlers`): registry lookup and outbound call via `transport`
//!
//! [`ShimEngine`] owns the registry, dispatcher and chain.

pub mod chain;
pub mod classify;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod registry;
pub mod transport;

pub use chain::{Middleware, MiddlewareChain, Next, Terminal};
pub use config::{ConfigError, ServerConfig, ServiceEntry, ShimConfig};
pub use dispatcher::Dispatcher;
pub use engine::{ShimEngine, ShimEngineBuilder};
pub use error::{ErrorClass, PipelineError};
pub use handlers::{EventHandler, Forwarder};
pub use middleware::{build_event_service, EventService};
pub use registry::EndpointRegistry;
pub use transport::{HttpTransport, Transport};
