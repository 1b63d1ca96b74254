//! Core library for the kube state exporter
//!
//! This crate turns cluster object state into Prometheus metric families:
//! - Per-kind generator tables (currently pods) mapping one object to samples
//! - Resource quantity parsing and unit classification
//! - Family merging, filtering and text exposition
//! - Health checks and observability

pub mod collector;
pub mod family;
pub mod generator;
pub mod health;
pub mod labels;
pub mod observability;
pub mod options;
pub mod pod;
pub mod quantity;
pub mod render;
pub mod store;

pub use collector::{CollectError, CollectReport, StateCollector};
pub use family::{FamilyDesc, MetricFamily, MetricKind, Sample};
pub use generator::{FamilyGenerator, GeneratorSet};
pub use health::{
    Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse,
    ReadinessResponse,
};
pub use observability::{ExporterMetrics, StructuredLogger};
pub use options::{CollectorOptions, FamilyFilter, OwnerSelection};
pub use pod::pod_generators;
pub use render::{encode_protos, encode_text, RenderError, TEXT_CONTENT_TYPE};
pub use store::{ObjectStore, StaticStore, StoreError};

use k8s_openapi::api::core::v1::Pod;
use std::sync::Arc;

/// Collector over pods
pub type PodCollector = StateCollector<Pod>;

/// Build a pod collector over a store with the given options
pub fn pod_collector(
    store: Arc<dyn ObjectStore<Pod>>,
    options: &CollectorOptions,
) -> Result<PodCollector, CollectError> {
    StateCollector::new(store, Arc::new(pod_generators(options)))
}
