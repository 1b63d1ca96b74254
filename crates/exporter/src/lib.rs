//! Kube state exporter
//!
//! Watches pods through the Kubernetes API, keeps them in a local cache and
//! serves the pod metric families on `/metrics` alongside health probes.

pub mod api;
pub mod config;
pub mod store;
