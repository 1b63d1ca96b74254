//! Metric family model
//!
//! A [`MetricFamily`] is one named, typed, documented group of samples. The
//! [`FamilyAccumulator`] merges samples contributed by many objects into one
//! family per name within a single generation pass.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Metric type of a family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Gauge,
    Counter,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
        }
    }
}

/// Static metadata of a family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyDesc {
    pub name: &'static str,
    pub help: &'static str,
    pub kind: MetricKind,
}

impl FamilyDesc {
    pub const fn gauge(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Gauge,
        }
    }

    pub const fn counter(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            kind: MetricKind::Counter,
        }
    }
}

/// One label-set/value pair within a family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

impl Sample {
    /// Create a sample from borrowed label pairs
    pub fn new(labels: &[(&str, &str)], value: f64) -> Self {
        Self {
            labels: labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            value,
        }
    }

    /// Add or replace a single label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Look up a label value
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

/// Convert a boolean into a gauge value
pub fn bool_value(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// A named, typed, documented metric family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFamily {
    pub name: String,
    pub help: String,
    pub kind: MetricKind,
    /// Unordered: consumers must not rely on sample order
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    pub fn new(desc: &FamilyDesc) -> Self {
        Self {
            name: desc.name.to_string(),
            help: desc.help.to_string(),
            kind: desc.kind,
            samples: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples whose labels contain every given pair
    pub fn matching<'a>(&'a self, labels: &'a [(&'a str, &'a str)]) -> impl Iterator<Item = &'a Sample> + 'a {
        self.samples
            .iter()
            .filter(move |s| labels.iter().all(|(k, v)| s.label(k) == Some(*v)))
    }
}

/// Accumulates samples into families keyed by name
///
/// Family metadata is taken from the first occurrence of a name; families
/// are returned in first-occurrence order.
#[derive(Debug, Default)]
pub struct FamilyAccumulator {
    families: Vec<MetricFamily>,
    index: HashMap<String, usize>,
}

impl FamilyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append samples to the family described by `desc`
    pub fn extend(&mut self, desc: &FamilyDesc, samples: impl IntoIterator<Item = Sample>) {
        let idx = match self.index.get(desc.name) {
            Some(&idx) => idx,
            None => {
                self.families.push(MetricFamily::new(desc));
                self.index.insert(desc.name.to_string(), self.families.len() - 1);
                self.families.len() - 1
            }
        };
        self.families[idx].samples.extend(samples);
    }

    /// Total number of samples accumulated so far
    pub fn sample_count(&self) -> usize {
        self.families.iter().map(|f| f.samples.len()).sum()
    }

    pub fn into_families(self) -> Vec<MetricFamily> {
        self.families
    }
}
