//! Network module with deferred startup lifecycle.
//!
//! `new()` wires shared state, `start()` binds the TCP listener, and
//! `serve()` accepts requests until the shutdown future resolves.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::config::NetworkConfig;
use super::handlers::{
    api_gateway_handler, direct_handler, eventbridge_handler, health_handler, invoke_handler,
    liveness_handler, readiness_handler, services_handler, sqs_handler, AppState,
};
use super::middleware::{body_limit_layer, build_http_layers, request_timeout_layer};
use super::shutdown::ShutdownController;
use crate::service::{build_event_service, EndpointRegistry, EventService, ServerConfig, ShimEngine};

/// Owns the HTTP server lifecycle.
///
/// 1. `new()` -- wraps the engine in its tower layers, allocates the shutdown controller
/// 2. `start()` -- binds the TCP listener to the configured address
/// 3. `serve()` -- serves until shutdown is signalled, then drains
pub struct NetworkModule {
    config: NetworkConfig,
    listener: Option<TcpListener>,
    events: EventService,
    registry: Arc<EndpointRegistry>,
    shutdown: Arc<ShutdownController>,
}

impl NetworkModule {
    /// Creates the module without binding any port.
    #[must_use]
    pub fn new(config: NetworkConfig, engine: ShimEngine, server_config: &ServerConfig) -> Self {
        let registry = Arc::clone(engine.registry());
        Self {
            config,
            listener: None,
            events: build_event_service(engine, server_config),
            registry,
            shutdown: Arc::new(ShutdownController::new()),
        }
    }

    #[must_use]
    pub fn shutdown_controller(&self) -> Arc<ShutdownController> {
        Arc::clone(&self.shutdown)
    }

    /// Assembles the axum router with all routes and HTTP layers.
    ///
    /// Routes:
    /// - `GET /health`, `GET /health/live`, `GET /health/ready`
    /// - `GET /services` -- registered functions
    /// - `POST /invoke/{function}` -- kind inferred from the body
    /// - `POST /sqs|eventbridge|api-gateway|direct/{function}` -- explicit kind
    ///
    /// Health and listing routes share the request timeout; event routes carry
    /// the body limit and are bounded by the per-call timeout.
    pub fn build_router(&self) -> Router {
        let state = AppState {
            events: self.events.clone(),
            registry: Arc::clone(&self.registry),
            shutdown: Arc::clone(&self.shutdown),
            start_time: Instant::now(),
        };

        let health_routes = Router::new()
            .route("/health", get(health_handler))
            .route("/health/live", get(liveness_handler))
            .route("/health/ready", get(readiness_handler))
            .route("/services", get(services_handler))
            .layer(request_timeout_layer(&self.config));

        let event_routes = Router::new()
            .route("/invoke/{function}", post(invoke_handler))
            .route("/sqs/{function}", post(sqs_handler))
            .route("/eventbridge/{function}", post(eventbridge_handler))
            .route("/api-gateway/{function}", post(api_gateway_handler))
            .route("/direct/{function}", post(direct_handler))
            .layer(body_limit_layer(&self.config));

        health_routes
            .merge(event_routes)
            .layer(build_http_layers(&self.config))
            .with_state(state)
    }

    /// Binds the listener and returns the actual port (useful with port 0).
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let listener = TcpListener::bind(self.config.bind_address()).await?;
        let port = listener.local_addr()?.port();
        info!(host = %self.config.host, port, "listener bound");

        self.listener = Some(listener);
        Ok(port)
    }

    /// Serves until `shutdown` resolves or the shutdown controller is
    /// triggered, then drains in-flight invocations.
    ///
    /// # Errors
    ///
    /// Returns an error if `start()` was not called first, or if the server
    /// hits a fatal I/O error.
    pub async fn serve(
        mut self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let Some(listener) = self.listener.take() else {
            anyhow::bail!("start() must be called before serve()");
        };
        let router = self.build_router();
        let controller = Arc::clone(&self.shutdown);

        controller.set_ready();
        info!(services = self.registry.len(), "serving event shim");

        let stopped = controller.shutdown_requested();
        let trigger = Arc::clone(&controller);
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    () = shutdown => trigger.trigger_shutdown(),
                    () = stopped => {}
                }
            })
            .await?;

        if controller.wait_for_drain(self.config.drain_timeout).await {
            info!("all invocations drained");
        } else {
            warn!(
                in_flight = controller.in_flight_count(),
                "drain timeout expired with invocations remaining"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::network::HealthState;
    use crate::service::handlers::tests::{test_registry, RecordingTransport};
    use crate::service::{PipelineError, Transport};

    fn local_network() -> NetworkConfig {
        NetworkConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..NetworkConfig::default()
        }
    }

    fn module_with(
        transport: Arc<dyn Transport>,
        config: &ServerConfig,
        network: NetworkConfig,
    ) -> NetworkModule {
        let engine = ShimEngine::standard(test_registry(), transport, config);
        NetworkModule::new(network, engine, config)
    }

    fn module(transport: &Arc<RecordingTransport>) -> NetworkModule {
        module_with(
            Arc::clone(transport) as Arc<dyn Transport>,
            &ServerConfig::default(),
            local_network(),
        )
    }

    /// Holds every call for `stall`, then reports it as timed out.
    struct StallingTransport {
        stall: Duration,
    }

    #[async_trait]
    impl Transport for StallingTransport {
        async fn post_json(&self, url: &str, _body: &Value) -> Result<Value, PipelineError> {
            tokio::time::sleep(self.stall).await;
            Err(PipelineError::CallTimeout {
                url: url.to_string(),
                timeout_ms: u64::try_from(self.stall.as_millis()).unwrap(),
            })
        }
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn router_serves_invoke_route() {
        let transport = Arc::new(RecordingTransport::replying(json!({"done": true})));
        let module = module(&transport);
        module.shutdown_controller().set_ready();

        let response = module
            .build_router()
            .oneshot(
                Request::post("/invoke/test-function")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"source": "orders", "detail-type": "Created"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_json(response).await, json!({"done": true}));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn router_maps_errors_to_status_and_body() {
        let transport = Arc::new(RecordingTransport::default());
        let module = module(&transport);
        module.shutdown_controller().set_ready();

        let response = module
            .build_router()
            .oneshot(
                Request::post("/direct/ghost")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({
                "error": "no service registered for function ghost",
                "class": "not_found"
            })
        );
    }

    #[tokio::test]
    async fn router_lists_services() {
        let module = module(&Arc::new(RecordingTransport::default()));

        let response = module
            .build_router()
            .oneshot(Request::get("/services").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["services"][0]["name"], "test-function");
    }

    #[tokio::test]
    async fn serve_without_start_is_an_error() {
        let module = module(&Arc::new(RecordingTransport::default()));
        let err = module
            .serve(std::future::pending::<()>())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("start()"));
    }

    #[tokio::test]
    async fn serves_over_tcp_and_stops_on_signal() {
        let transport = Arc::new(RecordingTransport::default());
        let mut module = module(&transport);
        let controller = module.shutdown_controller();
        let port = module.start().await.unwrap();
        assert!(port > 0);

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(module.serve(async {
            let _ = stop_rx.await;
        }));

        let url = format!("http://127.0.0.1:{port}/health/ready");
        let mut status = None;
        for _ in 0..50 {
            if let Ok(response) = reqwest::get(&url).await {
                status = Some(response.status().as_u16());
                if status == Some(200) {
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(status, Some(200));

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert_eq!(controller.health_state(), HealthState::Stopped);
    }

    #[tokio::test]
    async fn slow_batch_still_reports_its_failures() {
        let config = ServerConfig {
            asn_pipeline: true,
            call_timeout_ms: 300,
            ..ServerConfig::default()
        };
        let network = NetworkConfig {
            request_timeout: Duration::from_millis(100),
            ..local_network()
        };
        let transport = Arc::new(StallingTransport {
            stall: Duration::from_millis(300),
        });
        let module = module_with(transport, &config, network);
        module.shutdown_controller().set_ready();

        let record = json!({
            "messageId": "msg-001",
            "body": {
                "shipment_number": "SH-2025-001",
                "carrier": "FEDEX",
                "ship_to_address": "123 Factory St",
                "delivery_date": "2025-11-28",
                "items": [{"part_number": "BRK-1234-A", "quantity": 100}]
            }
        });
        let response = module
            .build_router()
            .oneshot(
                Request::post("/sqs/test-function")
                    .body(Body::from(json!({"Records": [record]}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"batchItemFailures": [{"itemIdentifier": "msg-001"}]})
        );
    }

    #[tokio::test]
    async fn oversized_event_body_is_rejected() {
        let transport = Arc::new(RecordingTransport::replying(json!({})));
        let network = NetworkConfig {
            max_body_bytes: 64,
            ..local_network()
        };
        let module = module_with(
            Arc::clone(&transport) as Arc<dyn Transport>,
            &ServerConfig::default(),
            network,
        );
        module.shutdown_controller().set_ready();
        let router = module.build_router();

        let padding = "x".repeat(128);
        let response = router
            .clone()
            .oneshot(
                Request::post("/direct/test-function")
                    .body(Body::from(json!({"padding": padding}).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(transport.call_count(), 0);

        let response = router
            .oneshot(
                Request::post("/direct/test-function")
                    .body(Body::from(r#"{"small": true}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn controller_trigger_stops_the_server() {
        let mut module = module(&Arc::new(RecordingTransport::default()));
        let controller = module.shutdown_controller();
        let port = module.start().await.unwrap();

        let server = tokio::spawn(module.serve(std::future::pending::<()>()));

        let url = format!("http://127.0.0.1:{port}/health/live");
        let mut live = false;
        for _ in 0..50 {
            if reqwest::get(&url).await.is_ok() {
                live = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(live);

        controller.trigger_shutdown();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(controller.health_state(), HealthState::Stopped);
    }
}
