//! Exporter configuration

use anyhow::{anyhow, Result};
use exporter_lib::{CollectorOptions, FamilyFilter, OwnerSelection};
use serde::Deserialize;

/// Environment variable prefix, e.g. `EXPORTER_API_PORT`
pub const ENV_PREFIX: &str = "EXPORTER";

/// Exporter configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExporterConfig {
    /// Node name from Kubernetes downward API
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// API server port for metrics and health probes
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Restrict the pod watch to one namespace; all namespaces when unset
    #[serde(default)]
    pub namespace: Option<String>,

    /// Comma-separated family names to expose; empty exposes all
    #[serde(default)]
    pub metric_allowlist: Option<String>,

    /// Comma-separated family names to suppress
    #[serde(default)]
    pub metric_denylist: Option<String>,

    /// `first` or `controller`
    #[serde(default = "default_owner_selection")]
    pub owner_selection: String,
}

fn default_node_name() -> String {
    std::env::var("NODE_NAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_owner_selection() -> String {
    "first".to_string()
}

impl ExporterConfig {
    /// Load configuration from `EXPORTER_*` environment variables
    pub fn load() -> Result<Self> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Load configuration from an environment source
    pub fn from_environment(env: config::Environment) -> Result<Self> {
        let config = config::Config::builder().add_source(env).build()?;
        let mut loaded: ExporterConfig = config.try_deserialize()?;
        loaded.namespace = loaded.namespace.filter(|ns| !ns.trim().is_empty());
        Ok(loaded)
    }

    /// Collector options derived from the family lists and owner selection
    pub fn collector_options(&self) -> Result<CollectorOptions> {
        let owner_selection: OwnerSelection = self
            .owner_selection
            .parse()
            .map_err(|e: String| anyhow!(e))?;

        Ok(CollectorOptions {
            family_filter: FamilyFilter::from_lists(
                self.metric_allowlist.as_deref(),
                self.metric_denylist.as_deref(),
            ),
            owner_selection,
        })
    }
}
