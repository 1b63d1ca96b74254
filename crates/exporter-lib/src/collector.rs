//! Collector orchestration
//!
//! Lists a snapshot from the store, runs the generator table over every
//! object in list order and merges the resulting samples into one family per
//! name. A failed list aborts the pass: no partial family set is returned.

use crate::family::{FamilyAccumulator, MetricFamily};
use crate::generator::GeneratorSet;
use crate::store::{ObjectStore, StoreError};
use prometheus::core::Desc;
use prometheus::proto;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

/// Errors from building or running a collector
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("failed to list {kind} objects: {source}")]
    Store {
        kind: &'static str,
        #[source]
        source: StoreError,
    },
    #[error("invalid metric descriptor: {0}")]
    Descriptor(#[from] prometheus::Error),
}

/// Result of one generation pass
#[derive(Debug, Clone)]
pub struct CollectReport {
    pub families: Vec<MetricFamily>,
    /// Number of objects in the snapshot
    pub objects: usize,
    /// Number of samples across all families
    pub samples: usize,
}

/// Generates metric families for every object in a store
pub struct StateCollector<K> {
    store: Arc<dyn ObjectStore<K>>,
    generators: Arc<GeneratorSet<K>>,
    descs: Vec<Desc>,
}

impl<K> StateCollector<K> {
    /// Create a collector over a store and an explicit generator table
    pub fn new(
        store: Arc<dyn ObjectStore<K>>,
        generators: Arc<GeneratorSet<K>>,
    ) -> Result<Self, CollectError> {
        let descs = generators
            .descs()
            .map(|d| Desc::new(d.name.to_string(), d.help.to_string(), vec![], HashMap::new()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            store,
            generators,
            descs,
        })
    }

    pub fn generators(&self) -> &GeneratorSet<K> {
        &self.generators
    }

    /// Run one generation pass
    pub fn collect(&self) -> Result<Vec<MetricFamily>, CollectError> {
        self.collect_report().map(|report| report.families)
    }

    /// Run one generation pass and report snapshot statistics
    pub fn collect_report(&self) -> Result<CollectReport, CollectError> {
        let objects = self.store.list().map_err(|source| CollectError::Store {
            kind: self.generators.kind(),
            source,
        })?;

        let mut acc = FamilyAccumulator::new();
        for object in &objects {
            self.generators.generate_into(object, &mut acc);
        }

        let samples = acc.sample_count();
        let families = acc.into_families();
        debug!(
            kind = self.generators.kind(),
            objects = objects.len(),
            families = families.len(),
            samples = samples,
            "Generation pass complete"
        );

        Ok(CollectReport {
            families,
            objects: objects.len(),
            samples,
        })
    }
}

impl<K: 'static> prometheus::core::Collector for StateCollector<K> {
    fn desc(&self) -> Vec<&Desc> {
        self.descs.iter().collect()
    }

    fn collect(&self) -> Vec<proto::MetricFamily> {
        match self.collect_report() {
            Ok(report) => report
                .families
                .iter()
                .filter(|f| !f.is_empty())
                .map(MetricFamily::to_proto)
                .collect(),
            Err(e) => {
                error!(error = %e, "Generation pass failed, exposing no families");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::{FamilyDesc, Sample};
    use crate::generator::FamilyGenerator;
    use crate::store::StaticStore;

    #[derive(Debug)]
    struct Job {
        name: &'static str,
        retries: u32,
    }

    fn job_generators() -> Arc<GeneratorSet<Job>> {
        Arc::new(GeneratorSet::new(
            "job",
            vec![
                FamilyGenerator::new(FamilyDesc::gauge("job_info", "Job info."), |j: &Job| {
                    vec![Sample::new(&[("job", j.name)], 1.0)]
                }),
                FamilyGenerator::new(
                    FamilyDesc::counter("job_retries_total", "Job retries."),
                    |j: &Job| vec![Sample::new(&[("job", j.name)], j.retries as f64)],
                ),
            ],
        ))
    }

    fn collector(store: StaticStore<Job>) -> StateCollector<Job> {
        StateCollector::new(Arc::new(store), job_generators()).unwrap()
    }

    #[test]
    fn test_collect_merges_objects_into_families() {
        let c = collector(StaticStore::new(vec![
            Job { name: "a", retries: 0 },
            Job { name: "b", retries: 2 },
        ]));

        let report = c.collect_report().unwrap();
        assert_eq!(report.objects, 2);
        assert_eq!(report.samples, 4);
        assert_eq!(report.families.len(), 2);
        assert_eq!(report.families[0].name, "job_info");
        assert_eq!(report.families[1].samples.len(), 2);
    }

    #[test]
    fn test_store_failure_aborts_pass() {
        let c = collector(StaticStore::unavailable("watch not started"));

        let err = c.collect().unwrap_err();
        assert!(matches!(
            err,
            CollectError::Store {
                kind: "job",
                source: StoreError::Unavailable(_)
            }
        ));
        assert!(err.to_string().contains("failed to list job objects"));
    }

    #[test]
    fn test_empty_snapshot_yields_no_families() {
        let c = collector(StaticStore::new(Vec::<Job>::new()));
        assert!(c.collect().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_family_name_is_rejected() {
        let generators = Arc::new(GeneratorSet::new(
            "job",
            vec![FamilyGenerator::new(
                FamilyDesc::gauge("job info", "Bad name."),
                |_: &Job| Vec::new(),
            )],
        ));
        let store: Arc<dyn ObjectStore<Job>> = Arc::new(StaticStore::new(Vec::<Job>::new()));

        let result = StateCollector::new(store, generators);
        assert!(matches!(result, Err(CollectError::Descriptor(_))));
    }

    #[test]
    fn test_registers_with_prometheus_registry() {
        let registry = prometheus::Registry::new();
        let c = collector(StaticStore::new(vec![Job { name: "a", retries: 1 }]));
        registry.register(Box::new(c)).unwrap();

        let gathered = registry.gather();
        let names: Vec<&str> = gathered.iter().map(|mf| mf.get_name()).collect();
        assert_eq!(names, vec!["job_info", "job_retries_total"]);
        assert_eq!(
            gathered[1].get_metric()[0].get_counter().get_value(),
            1.0
        );
    }

    #[test]
    fn test_prometheus_collect_swallows_store_errors() {
        use prometheus::core::Collector;

        let c = collector(StaticStore::unavailable("down"));
        assert!(Collector::collect(&c).is_empty());
        assert_eq!(c.desc().len(), 2);
    }
}
