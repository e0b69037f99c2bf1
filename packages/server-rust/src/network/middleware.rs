//! HTTP middleware stack for the event shim.
//!
//! Middleware ordering follows the outer-to-inner convention: the first
//! layer listed is the outermost (processes the request first on the way
//! in, and the response last on the way out).

use axum::extract::DefaultBodyLimit;
use axum::http::header::HeaderName;
use axum::http::{Method, StatusCode};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use super::config::NetworkConfig;

/// Header carrying the per-request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// The composed Tower layer type produced by [`build_http_layers`].
type HttpLayers = tower::layer::util::Stack<
    PropagateRequestIdLayer,
    tower::layer::util::Stack<
        CorsLayer,
        tower::layer::util::Stack<
            TraceLayer<
                tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
            >,
            tower::layer::util::Stack<SetRequestIdLayer<MakeRequestUuid>, tower::layer::util::Identity>,
        >,
    >,
>;

/// Builds the HTTP-level Tower middleware stack shared by every route.
///
/// **Middleware ordering (outermost to innermost):**
/// 1. `SetRequestId` -- assigns a UUID v4 `x-request-id` when the caller sent none
/// 2. `Tracing` -- logs request/response with structured trace spans
/// 3. `CORS` -- Cross-Origin Resource Sharing based on configured origins
/// 4. `PropagateRequestId` -- copies `x-request-id` from the request to the response
#[must_use]
pub fn build_http_layers(config: &NetworkConfig) -> HttpLayers {
    let x_request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    ServiceBuilder::new()
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.cors_origins))
        .layer(PropagateRequestIdLayer::new(x_request_id))
        .into_inner()
}

/// Request deadline for the health and listing routes; answers 408 when hit.
///
/// Event routes are left unwrapped; each outbound call they make is bounded by
/// `ServerConfig::call_timeout_ms` instead.
#[must_use]
pub fn request_timeout_layer(config: &NetworkConfig) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, config.request_timeout)
}

/// Caps event bodies at `max_body_bytes`; larger bodies are rejected with 413.
#[must_use]
pub fn body_limit_layer(config: &NetworkConfig) -> DefaultBodyLimit {
    DefaultBodyLimit::max(config.max_body_bytes)
}

/// Builds the CORS layer from the configured list of allowed origins.
///
/// A wildcard `"*"` allows any origin; otherwise each entry is parsed into an
/// explicit allowlist and unparsable entries are skipped.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn build_http_layers_does_not_panic_with_defaults() {
        let _layers = build_http_layers(&NetworkConfig::default());
    }

    #[test]
    fn build_cors_layer_specific_origins() {
        let origins = vec![
            "http://localhost:3000".to_string(),
            "not a header\n".to_string(),
        ];
        let _cors = build_cors_layer(&origins);
    }

    #[test]
    fn route_layers_build_from_custom_limits() {
        let config = NetworkConfig {
            request_timeout: Duration::from_secs(5),
            max_body_bytes: 1024,
            ..NetworkConfig::default()
        };
        let _timeout = request_timeout_layer(&config);
        let _limit = body_limit_layer(&config);
    }
}
