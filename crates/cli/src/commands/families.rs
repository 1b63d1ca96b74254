//! Family catalogue command

use anyhow::Result;
use exporter_lib::{pod_generators, CollectorOptions};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{color_kind, print_table, OutputFormat};

/// Row for the families table
#[derive(Tabled, Serialize)]
pub struct FamilyRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Type")]
    #[serde(rename = "type")]
    pub kind: String,
    #[tabled(rename = "Help")]
    pub help: String,
}

/// Enabled pod families, in generation order
pub fn family_rows(options: &CollectorOptions, colored: bool) -> Vec<FamilyRow> {
    pod_generators(options)
        .descs()
        .map(|d| FamilyRow {
            name: d.name.to_string(),
            kind: if colored {
                color_kind(d.kind)
            } else {
                d.kind.as_str().to_string()
            },
            help: d.help.to_string(),
        })
        .collect()
}

/// List the enabled family catalogue
pub fn list_families(options: &CollectorOptions, format: OutputFormat) -> Result<()> {
    let rows = family_rows(options, format == OutputFormat::Table);
    match format {
        OutputFormat::Text => {
            for row in &rows {
                println!("{}\t{}\t{}", row.name, row.kind, row.help);
            }
        }
        OutputFormat::Table => {
            print_table(&rows, format)?;
            println!("\nTotal: {} families", rows.len());
        }
        OutputFormat::Json => print_table(&rows, format)?,
    }
    Ok(())
}
