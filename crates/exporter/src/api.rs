//! HTTP API for health checks and Prometheus metrics

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use exporter_lib::{
    encode_protos,
    health::{Component, ComponentStatus, HealthRegistry},
    observability::{ExporterMetrics, StructuredLogger},
    CollectError, MetricFamily, PodCollector, TEXT_CONTENT_TYPE,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Shared application state
pub struct AppState {
    pub collector: PodCollector,
    pub health_registry: HealthRegistry,
    pub metrics: ExporterMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        collector: PodCollector,
        health_registry: HealthRegistry,
        metrics: ExporterMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            collector,
            health_registry,
            metrics,
            logger,
        }
    }

    async fn scrape_failed(&self, message: String) {
        self.metrics.inc_scrape_errors();
        self.logger.log_scrape_failure(&message);
        self.health_registry
            .set_degraded(Component::Collector, message)
            .await;
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still serving the last snapshot
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 once the pod store has synced
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Pod families followed by the exporter's own metrics
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let started = Instant::now();

    let report = match state.collector.collect_report() {
        Ok(report) => report,
        Err(e) => {
            let status = match e {
                CollectError::Store { .. } => StatusCode::SERVICE_UNAVAILABLE,
                CollectError::Descriptor(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let message = e.to_string();
            state.scrape_failed(message.clone()).await;
            return (status, message).into_response();
        }
    };

    let elapsed = started.elapsed();
    state
        .metrics
        .observe_scrape(elapsed.as_secs_f64(), report.objects, report.samples);

    let mut families: Vec<_> = report
        .families
        .iter()
        .filter(|f| !f.is_empty())
        .map(MetricFamily::to_proto)
        .collect();
    families.extend(prometheus::gather());

    match encode_protos(&families) {
        Ok(body) => {
            state
                .health_registry
                .set_healthy(Component::Collector)
                .await;
            state.logger.log_scrape(
                report.objects,
                report.families.len(),
                report.samples,
                elapsed.as_millis() as u64,
            );
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
                body,
            )
                .into_response()
        }
        Err(e) => {
            let message = e.to_string();
            state.scrape_failed(message.clone()).await;
            (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
        }
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
