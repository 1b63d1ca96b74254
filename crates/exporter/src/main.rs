//! Kube State Exporter - pod state metrics for Prometheus
//!
//! This binary runs as a Deployment in the cluster, watching pods through
//! the API server and exposing their state as metric families.

use anyhow::Result;
use exporter_lib::{
    health::HealthRegistry,
    observability::{ExporterMetrics, StructuredLogger},
    pod_collector,
};
use kube_state_exporter::{api, config::ExporterConfig, store::spawn_pod_reflector};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const EXPORTER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting kube-state-exporter");

    let config = ExporterConfig::load()?;
    let options = config.collector_options()?;
    info!(
        node_name = %config.node_name,
        namespace = ?config.namespace,
        owner_selection = ?options.owner_selection,
        "Exporter configured"
    );

    let health_registry = HealthRegistry::new();

    let metrics = ExporterMetrics::new();
    metrics.set_build_info(EXPORTER_VERSION);

    let logger = StructuredLogger::new(&config.node_name);

    let client = kube::Client::try_default().await?;
    let store = spawn_pod_reflector(
        client,
        config.namespace.as_deref(),
        health_registry.clone(),
        metrics.clone(),
        logger.clone(),
    );
    let collector = pod_collector(Arc::new(store), &options)?;
    info!(
        families = collector.generators().len(),
        "Pod generators built"
    );

    let app_state = Arc::new(api::AppState::new(
        collector,
        health_registry,
        metrics,
        logger.clone(),
    ));

    logger.log_startup(EXPORTER_VERSION, config.api_port, config.namespace.as_deref());
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
        served = api_handle => {
            match served {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    return Err(e);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    info!("Shutting down");
    Ok(())
}
