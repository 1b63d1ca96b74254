//! One-shot generation from the live cluster

use anyhow::{Context, Result};
use exporter_lib::CollectorOptions;
use k8s_openapi::api::core::v1::Pod;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::path::Path;

use super::render::generate;
use crate::output::{print_families, print_info, OutputFormat};

/// Build a client from an explicit kubeconfig, or the default chain otherwise
async fn client(kubeconfig: Option<&Path>) -> Result<Client> {
    match kubeconfig {
        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig {}", path.display()))?;
            let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("Invalid kubeconfig")?;
            Client::try_from(config).context("Failed to create Kubernetes client")
        }
        None => Client::try_default()
            .await
            .context("Failed to create Kubernetes client from the default config"),
    }
}

/// List pods once and print their metrics
pub async fn snapshot(
    kubeconfig: Option<&Path>,
    namespace: Option<&str>,
    options: &CollectorOptions,
    format: OutputFormat,
) -> Result<()> {
    let client = client(kubeconfig).await?;
    let api: Api<Pod> = match namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    };

    let pods = api
        .list(&ListParams::default())
        .await
        .context("Failed to list pods")?
        .items;
    print_info(&format!(
        "Listed {} pods in {}",
        pods.len(),
        namespace.unwrap_or("all namespaces")
    ));

    let families = generate(pods, options)?;
    print_families(&families, format)
}
