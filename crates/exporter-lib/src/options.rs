//! Options consumed by the generators and the collector

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

/// Allow/deny filter over family names
///
/// An empty allow-list enables every family; the deny-list always wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyFilter {
    pub allow: BTreeSet<String>,
    pub deny: BTreeSet<String>,
}

impl FamilyFilter {
    /// Build a filter from comma-separated allow and deny lists
    pub fn from_lists(allow: Option<&str>, deny: Option<&str>) -> Self {
        Self {
            allow: split_list(allow),
            deny: split_list(deny),
        }
    }

    pub fn is_enabled(&self, family: &str) -> bool {
        if self.deny.contains(family) {
            return false;
        }
        self.allow.is_empty() || self.allow.contains(family)
    }
}

fn split_list(list: Option<&str>) -> BTreeSet<String> {
    list.map(|l| {
        l.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Which owner reference identifies the creator of an object
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerSelection {
    /// First entry of the owner reference list
    #[default]
    First,
    /// The entry flagged as controller, falling back to the first entry
    Controller,
}

impl FromStr for OwnerSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(OwnerSelection::First),
            "controller" => Ok(OwnerSelection::Controller),
            other => Err(format!(
                "unknown owner selection {:?}, expected \"first\" or \"controller\"",
                other
            )),
        }
    }
}

/// Options for building a collector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectorOptions {
    pub family_filter: FamilyFilter,
    pub owner_selection: OwnerSelection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_enables_everything() {
        let filter = FamilyFilter::default();
        assert!(filter.is_enabled("kube_pod_info"));
    }

    #[test]
    fn test_allow_list_restricts() {
        let filter = FamilyFilter::from_lists(Some("kube_pod_info, kube_pod_owner"), None);
        assert!(filter.is_enabled("kube_pod_info"));
        assert!(filter.is_enabled("kube_pod_owner"));
        assert!(!filter.is_enabled("kube_pod_created"));
    }

    #[test]
    fn test_deny_wins_over_allow() {
        let filter =
            FamilyFilter::from_lists(Some("kube_pod_info"), Some("kube_pod_info,,kube_pod_labels"));
        assert!(!filter.is_enabled("kube_pod_info"));
        assert!(!filter.is_enabled("kube_pod_labels"));
        assert_eq!(filter.deny.len(), 2);
    }

    #[test]
    fn test_owner_selection_parse() {
        assert_eq!("first".parse::<OwnerSelection>(), Ok(OwnerSelection::First));
        assert_eq!(
            " Controller ".parse::<OwnerSelection>(),
            Ok(OwnerSelection::Controller)
        );
        assert!("newest".parse::<OwnerSelection>().is_err());
    }
}
