//! Offline generation from a pod list file

use anyhow::{Context, Result};
use exporter_lib::{pod_collector, CollectorOptions, MetricFamily, StaticStore};
use k8s_openapi::api::core::v1::Pod;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;

use crate::output::{print_families, print_info, OutputFormat};

/// Accepted file shapes: `kubectl get pods -o json` output or a bare array
#[derive(Deserialize)]
#[serde(untagged)]
enum PodFile {
    List { items: Vec<Pod> },
    Pods(Vec<Pod>),
}

/// Parse pods from JSON text
pub fn parse_pods(content: &str) -> Result<Vec<Pod>> {
    let file: PodFile = serde_json::from_str(content)
        .context("Expected a pod list object with `items` or a JSON array of pods")?;

    Ok(match file {
        PodFile::List { items } => items,
        PodFile::Pods(pods) => pods,
    })
}

/// Read pods from a JSON file
pub fn load_pods(path: &Path) -> Result<Vec<Pod>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_pods(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Run the pod generators over an in-memory pod list
pub fn generate(pods: Vec<Pod>, options: &CollectorOptions) -> Result<Vec<MetricFamily>> {
    let collector = pod_collector(Arc::new(StaticStore::new(pods)), options)?;
    Ok(collector.collect()?)
}

/// Generate and print metrics for the pods in a file
pub fn render_file(path: &Path, options: &CollectorOptions, format: OutputFormat) -> Result<()> {
    let pods = load_pods(path)?;
    print_info(&format!("Loaded {} pods from {}", pods.len(), path.display()));

    let families = generate(pods, options)?;
    print_families(&families, format)
}
