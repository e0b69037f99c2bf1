//! `shim-server` binary.
//!
//! Environment:
//! - `SHIM_CONFIG`: path to a JSON document with `services` and `server` sections
//! - `SHIM_HOST`, `SHIM_PORT`: bind address (default `0.0.0.0:8000`)
//! - `SHIM_LOG_JSON`: `1` or `true` for JSON log lines
//! - `RUST_LOG`: log filter

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use shim_server::service::HttpTransport;
use shim_server::telemetry::{init_tracing, DEFAULT_FILTER};
use shim_server::{EndpointRegistry, NetworkConfig, NetworkModule, ShimConfig, ShimEngine};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let json_logs = env::var("SHIM_LOG_JSON")
        .is_ok_and(|value| value == "1" || value.eq_ignore_ascii_case("true"));
    init_tracing(DEFAULT_FILTER, json_logs);

    let config = load_config()?;
    config.validate()?;

    let registry = Arc::new(EndpointRegistry::from_entries(&config.services));
    let transport = Arc::new(HttpTransport::new(Duration::from_millis(
        config.server.call_timeout_ms,
    ))?);
    let engine = ShimEngine::standard(registry, transport, &config.server);

    let mut network = NetworkConfig::default();
    if let Ok(host) = env::var("SHIM_HOST") {
        network.host = host;
    }
    if let Ok(port) = env::var("SHIM_PORT") {
        network.port = port
            .parse()
            .with_context(|| format!("invalid SHIM_PORT {port:?}"))?;
    }

    let mut module = NetworkModule::new(network, engine, &config.server);
    let port = module.start().await?;
    info!(port, "event shim listening");

    module.serve(shutdown_signal()).await
}

fn load_config() -> anyhow::Result<ShimConfig> {
    let Ok(path) = env::var("SHIM_CONFIG") else {
        warn!("SHIM_CONFIG not set, starting with no registered services");
        return Ok(ShimConfig::default());
    };
    let text =
        std::fs::read_to_string(&path).with_context(|| format!("reading config file {path}"))?;
    let config = ShimConfig::from_json(&text).with_context(|| format!("parsing {path}"))?;
    info!(path = %path, services = config.services.len(), "configuration loaded");
    Ok(config)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
