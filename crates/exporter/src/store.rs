//! Pod store backed by a kube-runtime reflector
//!
//! The reflector keeps an in-memory copy of every pod the watch delivers.
//! Listing before the initial list has completed fails with
//! [`StoreError::NotSynced`] so the first scrape never exposes a partial
//! cluster view.

use exporter_lib::health::{Component, HealthRegistry};
use exporter_lib::observability::{ExporterMetrics, StructuredLogger};
use exporter_lib::store::{ObjectStore, StoreError};
use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::reflector::Store;
use kube::runtime::{reflector, watcher, WatchStreamExt};
use kube::{Api, Client};
use std::pin::pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Pod snapshots read from the reflector cache
#[derive(Clone)]
pub struct ReflectorStore {
    reader: Store<Pod>,
    synced: Arc<AtomicBool>,
}

impl ReflectorStore {
    pub fn new(reader: Store<Pod>, synced: Arc<AtomicBool>) -> Self {
        Self { reader, synced }
    }

    pub fn is_synced(&self) -> bool {
        self.synced.load(Ordering::Acquire)
    }
}

impl ObjectStore<Pod> for ReflectorStore {
    fn list(&self) -> Result<Vec<Arc<Pod>>, StoreError> {
        if !self.is_synced() {
            return Err(StoreError::NotSynced);
        }

        // Cache iteration order is arbitrary; keep output stable across scrapes
        let mut pods = self.reader.state();
        pods.sort_by(|a, b| {
            let key = |p: &Pod| (p.metadata.namespace.clone(), p.metadata.name.clone());
            key(a).cmp(&key(b))
        });
        Ok(pods)
    }
}

/// Tracks watch progress and reports it to health, metrics and logs
pub struct WatchObserver {
    synced: Arc<AtomicBool>,
    health: HealthRegistry,
    metrics: ExporterMetrics,
    logger: StructuredLogger,
    failing: bool,
}

impl WatchObserver {
    pub fn new(
        synced: Arc<AtomicBool>,
        health: HealthRegistry,
        metrics: ExporterMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            synced,
            health,
            metrics,
            logger,
            failing: false,
        }
    }

    pub async fn observe(&mut self, event: &Result<watcher::Event<Pod>, watcher::Error>) {
        match event {
            Ok(event) => {
                if let watcher::Event::Restarted(pods) = event {
                    if !self.synced.swap(true, Ordering::AcqRel) {
                        self.logger.log_store_synced(pods.len());
                        self.health.mark_store_synced().await;
                    } else {
                        debug!(objects = pods.len(), "Pod watch relisted");
                    }
                }
                if self.failing {
                    self.failing = false;
                    self.health.set_healthy(Component::Store).await;
                }
            }
            Err(e) => {
                let message = e.to_string();
                self.metrics.inc_watch_errors();
                self.logger.log_watch_error(&message);
                self.health.set_degraded(Component::Store, message).await;
                self.failing = true;
            }
        }
    }

    /// Drive a watch event stream to completion
    pub async fn run<S>(mut self, stream: S)
    where
        S: Stream<Item = Result<watcher::Event<Pod>, watcher::Error>>,
    {
        let mut stream = pin!(stream);
        while let Some(event) = stream.next().await {
            self.observe(&event).await;
        }

        self.health
            .set_unhealthy(Component::Store, "Pod watch stream ended")
            .await;
    }
}

/// Start watching pods (cluster-wide or in one namespace) and return the store
pub fn spawn_pod_reflector(
    client: Client,
    namespace: Option<&str>,
    health: HealthRegistry,
    metrics: ExporterMetrics,
    logger: StructuredLogger,
) -> ReflectorStore {
    let api: Api<Pod> = match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    };

    let (reader, writer) = reflector::store();
    let synced = Arc::new(AtomicBool::new(false));
    let stream = reflector(writer, watcher(api, watcher::Config::default())).default_backoff();
    let observer = WatchObserver::new(synced.clone(), health, metrics, logger);
    tokio::spawn(observer.run(stream));

    ReflectorStore::new(reader, synced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use exporter_lib::health::ComponentStatus;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kube::error::ErrorResponse;

    fn pod(namespace: &str, name: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                namespace: Some(namespace.to_string()),
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn watch_error() -> watcher::Error {
        watcher::Error::WatchError(ErrorResponse {
            status: "Failure".to_string(),
            message: "too old resource version".to_string(),
            reason: "Expired".to_string(),
            code: 410,
        })
    }

    struct Fixture {
        store: ReflectorStore,
        writer: reflector::store::Writer<Pod>,
        observer: WatchObserver,
        health: HealthRegistry,
    }

    async fn fixture() -> Fixture {
        let (reader, writer) = reflector::store();
        let synced = Arc::new(AtomicBool::new(false));
        let health = HealthRegistry::new();
        let observer = WatchObserver::new(
            synced.clone(),
            health.clone(),
            ExporterMetrics::new(),
            StructuredLogger::new("test-node"),
        );

        Fixture {
            store: ReflectorStore::new(reader, synced),
            writer,
            observer,
            health,
        }
    }

    async fn deliver(f: &mut Fixture, event: Result<watcher::Event<Pod>, watcher::Error>) {
        if let Ok(event) = &event {
            f.writer.apply_watcher_event(event);
        }
        f.observer.observe(&event).await;
    }

    #[tokio::test]
    async fn test_list_before_sync_fails() {
        let f = fixture().await;
        assert_eq!(f.store.list().unwrap_err(), StoreError::NotSynced);
        assert!(!f.health.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_initial_list_syncs_and_sorts() {
        let mut f = fixture().await;
        let pods = vec![pod("ns2", "a"), pod("ns1", "b"), pod("ns1", "a")];
        deliver(&mut f, Ok(watcher::Event::Restarted(pods))).await;

        assert!(f.store.is_synced());
        assert!(f.health.readiness().await.ready);

        let listed: Vec<(String, String)> = f
            .store
            .list()
            .unwrap()
            .iter()
            .map(|p| {
                (
                    p.metadata.namespace.clone().unwrap_or_default(),
                    p.metadata.name.clone().unwrap_or_default(),
                )
            })
            .collect();
        assert_eq!(
            listed,
            vec![
                ("ns1".to_string(), "a".to_string()),
                ("ns1".to_string(), "b".to_string()),
                ("ns2".to_string(), "a".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_applied_and_deleted_events_update_snapshot() {
        let mut f = fixture().await;
        deliver(&mut f, Ok(watcher::Event::Restarted(vec![pod("ns1", "a")]))).await;
        deliver(&mut f, Ok(watcher::Event::Applied(pod("ns1", "b")))).await;
        deliver(&mut f, Ok(watcher::Event::Deleted(pod("ns1", "a")))).await;

        let names: Vec<String> = f
            .store
            .list()
            .unwrap()
            .iter()
            .filter_map(|p| p.metadata.name.clone())
            .collect();
        assert_eq!(names, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_watch_error_degrades_then_recovers() {
        let mut f = fixture().await;
        deliver(&mut f, Ok(watcher::Event::Restarted(vec![pod("ns1", "a")]))).await;

        deliver(&mut f, Err(watch_error())).await;
        let health = f.health.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        // A failing watch keeps serving the last snapshot
        assert_eq!(f.store.list().unwrap().len(), 1);
        assert!(f.health.readiness().await.ready);

        deliver(&mut f, Ok(watcher::Event::Applied(pod("ns1", "b")))).await;
        assert_eq!(f.health.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_error_before_sync_keeps_store_unsynced() {
        let mut f = fixture().await;
        deliver(&mut f, Err(watch_error())).await;

        assert_eq!(f.store.list().unwrap_err(), StoreError::NotSynced);
        assert!(!f.health.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_stream_end_marks_store_unhealthy() {
        let f = fixture().await;
        let events = futures::stream::iter(vec![Ok::<_, watcher::Error>(
            watcher::Event::Restarted(vec![pod("ns1", "a")]),
        )]);
        f.observer.run(events).await;

        assert_eq!(f.health.health().await.status, ComponentStatus::Unhealthy);
        assert!(f.store.is_synced());
        assert!(!f.health.readiness().await.ready);
    }
}
