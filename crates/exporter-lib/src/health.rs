//! Liveness and readiness state for the exporter
//!
//! Two components are tracked: the pod store fed by the watch, and the
//! collector that turns it into families on every scrape. Readiness follows
//! the store: the exporter is ready once the initial list has been applied
//! and for as long as the watch stream has not ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health-tracked parts of the exporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    /// Pod watch and cache
    Store,
    /// Family generation and rendering
    Collector,
}

impl Component {
    pub const ALL: [Component; 2] = [Component::Store, Component::Collector];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Store => "store",
            Component::Collector => "collector",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health status of a component, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Still serving, usually the last synced snapshot
    Degraded,
    Unhealthy,
}

/// Current state of one component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When the component entered its current status
    pub since: DateTime<Utc>,
}

impl ComponentHealth {
    fn new(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            since: Utc::now(),
        }
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<Component, ComponentHealth>,
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug)]
struct HealthState {
    components: BTreeMap<Component, ComponentHealth>,
    store_synced: bool,
}

/// Shared health state, cloned into the API and the watch task
#[derive(Debug, Clone)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    /// Every component starts healthy; the store starts unsynced
    pub fn new() -> Self {
        let components = Component::ALL
            .iter()
            .map(|c| (*c, ComponentHealth::new(ComponentStatus::Healthy, None)))
            .collect();
        Self {
            state: Arc::new(RwLock::new(HealthState {
                components,
                store_synced: false,
            })),
        }
    }

    /// Record a status. `since` only moves when the status changes.
    pub async fn set(&self, component: Component, status: ComponentStatus, message: Option<String>) {
        let mut state = self.state.write().await;
        match state.components.get_mut(&component) {
            Some(current) if current.status == status => current.message = message,
            _ => {
                state
                    .components
                    .insert(component, ComponentHealth::new(status, message));
            }
        }
    }

    pub async fn set_healthy(&self, component: Component) {
        self.set(component, ComponentStatus::Healthy, None).await;
    }

    pub async fn set_degraded(&self, component: Component, message: impl Into<String>) {
        self.set(component, ComponentStatus::Degraded, Some(message.into()))
            .await;
    }

    pub async fn set_unhealthy(&self, component: Component, message: impl Into<String>) {
        self.set(component, ComponentStatus::Unhealthy, Some(message.into()))
            .await;
    }

    /// The initial list has been applied; the store is healthy and ready
    pub async fn mark_store_synced(&self) {
        self.state.write().await.store_synced = true;
        self.set_healthy(Component::Store).await;
    }

    pub async fn store_synced(&self) -> bool {
        self.state.read().await.store_synced
    }

    pub async fn status_of(&self, component: Component) -> Option<ComponentStatus> {
        self.state
            .read()
            .await
            .components
            .get(&component)
            .map(|h| h.status)
    }

    /// Aggregate status is the worst component status
    pub async fn health(&self) -> HealthResponse {
        let components = self.state.read().await.components.clone();
        let status = components
            .values()
            .map(|h| h.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);
        HealthResponse { status, components }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;
        let not_ready = |reason: String| ReadinessResponse {
            ready: false,
            reason: Some(reason),
        };

        if !state.store_synced {
            return not_ready("Pod store not yet synced".to_string());
        }
        match state.components.get(&Component::Store) {
            Some(store) if store.status == ComponentStatus::Unhealthy => not_ready(
                store
                    .message
                    .clone()
                    .unwrap_or_else(|| "Pod store unhealthy".to_string()),
            ),
            _ => ReadinessResponse {
                ready: true,
                reason: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_components_start_healthy() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(health.components.len(), 2);
        assert_eq!(
            registry.status_of(Component::Collector).await,
            Some(ComponentStatus::Healthy)
        );
    }

    #[tokio::test]
    async fn test_aggregate_is_worst_component() {
        let registry = HealthRegistry::new();
        registry
            .set_degraded(Component::Collector, "Last scrape failed")
            .await;
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);

        registry
            .set_unhealthy(Component::Store, "Pod watch stream ended")
            .await;
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_not_ready_until_store_synced() {
        let registry = HealthRegistry::new();
        let readiness = registry.readiness().await;

        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Pod store not yet synced"));

        registry.mark_store_synced().await;
        assert!(registry.store_synced().await);
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_sync_heals_store() {
        let registry = HealthRegistry::new();
        registry.set_degraded(Component::Store, "Watch error").await;
        registry.mark_store_synced().await;

        assert_eq!(
            registry.status_of(Component::Store).await,
            Some(ComponentStatus::Healthy)
        );
    }

    #[tokio::test]
    async fn test_degraded_store_stays_ready() {
        let registry = HealthRegistry::new();
        registry.mark_store_synced().await;
        registry
            .set_degraded(Component::Store, "Watch error, retrying")
            .await;

        assert!(registry.readiness().await.ready);
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);
    }

    #[tokio::test]
    async fn test_ended_store_is_not_ready() {
        let registry = HealthRegistry::new();
        registry.mark_store_synced().await;
        registry
            .set_unhealthy(Component::Store, "Pod watch stream ended")
            .await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Pod watch stream ended"));
    }

    #[tokio::test]
    async fn test_degraded_collector_does_not_affect_readiness() {
        let registry = HealthRegistry::new();
        registry.mark_store_synced().await;
        registry
            .set_degraded(Component::Collector, "Last scrape failed")
            .await;

        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_since_kept_while_status_unchanged() {
        let registry = HealthRegistry::new();
        registry.set_degraded(Component::Store, "first error").await;
        let first = registry.health().await.components[&Component::Store].clone();

        registry.set_degraded(Component::Store, "second error").await;
        let second = registry.health().await.components[&Component::Store].clone();

        assert_eq!(first.since, second.since);
        assert_eq!(second.message.as_deref(), Some("second error"));
    }

    #[test]
    fn test_health_response_keys_are_component_names() {
        let mut components = BTreeMap::new();
        components.insert(
            Component::Store,
            ComponentHealth::new(ComponentStatus::Degraded, Some("retrying".to_string())),
        );
        let response = HealthResponse {
            status: ComponentStatus::Degraded,
            components,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["components"]["store"]["message"], "retrying");
    }
}
