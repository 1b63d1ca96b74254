//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use exporter_lib::{encode_text, MetricFamily, MetricKind};
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Prometheus text exposition format
    Text,
}

/// Print a table from a list of items (text output falls back to the table)
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table | OutputFormat::Text => {
            if items.is_empty() {
                print_warning("No items found");
                return Ok(());
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
    }
    Ok(())
}

/// Row for the samples table
#[derive(Tabled, Serialize)]
struct SampleRow {
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Labels")]
    labels: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Print generated families in the requested format
pub fn print_families(families: &[MetricFamily], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            print!("{}", encode_text(families)?);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(families)?);
        }
        OutputFormat::Table => {
            let rows: Vec<SampleRow> = families
                .iter()
                .flat_map(|f| {
                    f.samples.iter().map(move |s| SampleRow {
                        family: f.name.clone(),
                        labels: s
                            .labels
                            .iter()
                            .map(|(k, v)| format!("{}={}", k, v))
                            .collect::<Vec<_>>()
                            .join(","),
                        value: format_value(s.value),
                    })
                })
                .collect();
            print_table(&rows, format)?;
            let samples: usize = families.iter().map(|f| f.samples.len()).sum();
            println!("\nTotal: {} families, {} samples", families.len(), samples);
        }
    }
    Ok(())
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message to stderr so it never mixes with exposition output
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a sample value without a trailing `.0` for whole numbers
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Color a metric type
pub fn color_kind(kind: MetricKind) -> String {
    match kind {
        MetricKind::Gauge => kind.as_str().green().to_string(),
        MetricKind::Counter => kind.as_str().blue().to_string(),
    }
}
