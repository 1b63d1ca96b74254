//! Integration tests for the exporter API endpoints

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use exporter_lib::{
    health::{Component, HealthRegistry},
    observability::{ExporterMetrics, StructuredLogger},
    pod_collector, CollectorOptions, FamilyFilter, ObjectStore, StaticStore, StoreError,
};
use k8s_openapi::api::core::v1::{Pod, PodSpec, PodStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube_state_exporter::api::{create_router, AppState};
use std::sync::Arc;
use tower::ServiceExt;

/// Store that never finishes its initial list
struct UnsyncedStore;

impl ObjectStore<Pod> for UnsyncedStore {
    fn list(&self) -> Result<Vec<Arc<Pod>>, StoreError> {
        Err(StoreError::NotSynced)
    }
}

fn pod(namespace: &str, name: &str, phase: &str) -> Pod {
    Pod {
        metadata: ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            node_name: Some("node1".to_string()),
            ..Default::default()
        }),
        status: Some(PodStatus {
            phase: Some(phase.to_string()),
            ..Default::default()
        }),
    }
}

async fn setup_app(
    store: Arc<dyn ObjectStore<Pod>>,
    options: CollectorOptions,
) -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();

    let collector = pod_collector(store, &options).unwrap();
    let state = Arc::new(AppState::new(
        collector,
        health_registry,
        ExporterMetrics::new(),
        StructuredLogger::new("test-node"),
    ));
    let router = create_router(state.clone());

    (router, state)
}

async fn setup_test_app() -> (Router, Arc<AppState>) {
    setup_app(
        Arc::new(StaticStore::new(vec![
            pod("ns1", "pod1", "Running"),
            pod("ns2", "pod2", "Pending"),
        ])),
        CollectorOptions::default(),
    )
    .await
}

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_metrics_exposes_pod_families() {
    let (app, _state) = setup_test_app().await;

    let (status, content_type, body) = get(app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some(prometheus::TEXT_FORMAT));
    assert!(body.contains("# TYPE kube_pod_status_phase gauge"));
    assert!(body.contains(r#"kube_pod_status_phase{namespace="ns1",phase="Running",pod="pod1"} 1"#));
    assert!(body.contains(r#"kube_pod_status_phase{namespace="ns2",phase="Running",pod="pod2"} 0"#));
    assert_eq!(body.matches("# HELP kube_pod_info ").count(), 1);
}

#[tokio::test]
async fn test_metrics_includes_self_metrics() {
    let (app, _state) = setup_test_app().await;

    let (_, _, body) = get(app, "/metrics").await;

    assert!(body.contains("kube_state_exporter_scrapes_total"));
    assert!(body.contains("kube_state_exporter_scrape_duration_seconds_bucket"));
}

#[tokio::test]
async fn test_metrics_honors_family_filter() {
    let options = CollectorOptions {
        family_filter: FamilyFilter::from_lists(None, Some("kube_pod_status_phase")),
        ..Default::default()
    };
    let (app, _state) = setup_app(
        Arc::new(StaticStore::new(vec![pod("ns1", "pod1", "Running")])),
        options,
    )
    .await;

    let (status, _, body) = get(app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("kube_pod_status_phase"));
    assert!(body.contains("kube_pod_info{"));
}

#[tokio::test]
async fn test_metrics_unavailable_before_store_sync() {
    let (app, state) = setup_app(Arc::new(UnsyncedStore), CollectorOptions::default()).await;
    let errors = state.metrics.scrape_errors();

    let (status, _, body) = get(app, "/metrics").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("initial sync"));
    assert!(state.metrics.scrape_errors() > errors);

    let health = state.health_registry.health().await;
    assert_eq!(
        health.components[&Component::Collector].status,
        exporter_lib::ComponentStatus::Degraded
    );
}

#[tokio::test]
async fn test_metrics_unavailable_store() {
    let (app, _state) = setup_app(
        Arc::new(StaticStore::<Pod>::unavailable("watch not started")),
        CollectorOptions::default(),
    )
    .await;

    let (status, _, body) = get(app, "/metrics").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("watch not started"));
}

#[tokio::test]
async fn test_successful_scrape_restores_collector_health() {
    let (app, state) = setup_test_app().await;
    state
        .health_registry
        .set_degraded(Component::Collector, "Last scrape failed")
        .await;

    let (status, _, _) = get(app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    let health = state.health_registry.health().await;
    assert_eq!(health.status, exporter_lib::ComponentStatus::Healthy);
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app().await;

    let (status, _, body) = get(app, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "healthy");
    assert!(health["components"].get("store").is_some());
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let (app, state) = setup_test_app().await;
    state
        .health_registry
        .set_degraded(Component::Store, "Watch error, retrying")
        .await;

    let (status, _, body) = get(app, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    let health: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app().await;
    state
        .health_registry
        .set_unhealthy(Component::Store, "Pod watch stream ended")
        .await;

    let (status, _, body) = get(app, "/healthz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let health: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(health["status"], "unhealthy");
    assert_eq!(
        health["components"]["store"]["message"],
        "Pod watch stream ended"
    );
}

#[tokio::test]
async fn test_readyz_returns_503_before_sync() {
    let (app, _state) = setup_test_app().await;

    let (status, _, body) = get(app, "/readyz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let readiness: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(readiness["ready"], false);
    assert_eq!(readiness["reason"], "Pod store not yet synced");
}

#[tokio::test]
async fn test_readyz_returns_ok_when_ready() {
    let (app, state) = setup_test_app().await;
    state.health_registry.mark_store_synced().await;

    let (status, _, body) = get(app, "/readyz").await;

    assert_eq!(status, StatusCode::OK);
    let readiness: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(readiness["ready"], true);
    assert!(readiness.get("reason").is_none());
}

#[tokio::test]
async fn test_readyz_returns_503_after_watch_ends() {
    let (app, state) = setup_test_app().await;
    state.health_registry.mark_store_synced().await;
    state
        .health_registry
        .set_unhealthy(Component::Store, "Pod watch stream ended")
        .await;

    let (status, _, body) = get(app, "/readyz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let readiness: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(readiness["reason"], "Pod watch stream ended");
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let (app, _state) = setup_test_app().await;

    let (status, _, _) = get(app, "/nonexistent").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
