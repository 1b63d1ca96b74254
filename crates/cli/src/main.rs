//! Kube State Exporter CLI
//!
//! A command-line tool for inspecting the pod metric families, rendering
//! them offline from saved pod lists, and taking one-shot cluster snapshots.

mod commands;
mod config;
mod output;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use commands::{families, render, snapshot};
use exporter_lib::{CollectorOptions, FamilyFilter, OwnerSelection};
use output::OutputFormat;
use std::path::PathBuf;

/// Kube State Exporter CLI
#[derive(Parser)]
#[command(name = "kse")]
#[command(author, version, about = "CLI for Kube State Exporter", long_about = None)]
pub struct Cli {
    /// Path to kubeconfig file (uses default if not specified)
    #[arg(long, env = "KUBECONFIG", global = true)]
    pub kubeconfig: Option<PathBuf>,

    /// Output format (defaults to the config file, then table for families and text otherwise)
    #[arg(long, short, global = true)]
    pub format: Option<OutputFormat>,

    /// Comma-separated families to expose (all when empty)
    #[arg(long, global = true)]
    pub allow: Option<String>,

    /// Comma-separated families to suppress
    #[arg(long, global = true)]
    pub deny: Option<String>,

    /// Owner reference reported as the pod's creator: first or controller
    #[arg(long, default_value = "first", global = true)]
    pub owner_selection: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the metric families that would be generated
    Families,

    /// Generate metrics from a pod list file
    Render {
        /// JSON file holding a pod list (`kubectl get pods -o json`) or an array of pods
        #[arg(long)]
        file: PathBuf,

        /// Restrict output to these families (repeatable)
        #[arg(long = "family")]
        families: Vec<String>,
    },

    /// Generate metrics from the pods currently in the cluster
    Snapshot {
        /// Namespace to list (falls back to the config file default)
        #[arg(long, short)]
        namespace: Option<String>,

        /// List pods in every namespace
        #[arg(long, short = 'A', conflicts_with = "namespace")]
        all_namespaces: bool,

        /// Restrict output to these families (repeatable)
        #[arg(long = "family")]
        families: Vec<String>,
    },
}

impl Cli {
    fn collector_options(&self, families: &[String]) -> Result<CollectorOptions> {
        let owner_selection: OwnerSelection =
            self.owner_selection.parse().map_err(|e: String| anyhow!(e))?;

        let mut family_filter = FamilyFilter::from_lists(self.allow.as_deref(), self.deny.as_deref());
        family_filter.allow.extend(families.iter().cloned());

        Ok(CollectorOptions {
            family_filter,
            owner_selection,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::Config::load()?;
    let format_or = |fallback| cli.format.or(config.default_format).unwrap_or(fallback);

    match &cli.command {
        Commands::Families => {
            let options = cli.collector_options(&[])?;
            families::list_families(&options, format_or(OutputFormat::Table))?;
        }
        Commands::Render { file, families } => {
            let options = cli.collector_options(families)?;
            render::render_file(file, &options, format_or(OutputFormat::Text))?;
        }
        Commands::Snapshot {
            namespace,
            all_namespaces,
            families,
        } => {
            let options = cli.collector_options(families)?;
            let namespace = if *all_namespaces {
                None
            } else {
                namespace.clone().or_else(|| config.default_namespace.clone())
            };
            snapshot::snapshot(
                cli.kubeconfig.as_deref(),
                namespace.as_deref(),
                &options,
                format_or(OutputFormat::Text),
            )
            .await?;
        }
    }

    Ok(())
}
