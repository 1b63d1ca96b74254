//! Per-kind generator tables
//!
//! A [`GeneratorSet`] is the explicit table of family generators for one
//! object kind. It is built once at startup, filtered by the enabled-family
//! options, and handed to the collector.

use crate::family::{FamilyAccumulator, FamilyDesc, Sample};
use crate::options::FamilyFilter;

type GenerateFn<K> = Box<dyn Fn(&K) -> Vec<Sample> + Send + Sync>;

/// Produces the samples of one family for one object
pub struct FamilyGenerator<K> {
    pub desc: FamilyDesc,
    generate: GenerateFn<K>,
}

impl<K> FamilyGenerator<K> {
    pub fn new<F>(desc: FamilyDesc, generate: F) -> Self
    where
        F: Fn(&K) -> Vec<Sample> + Send + Sync + 'static,
    {
        Self {
            desc,
            generate: Box::new(generate),
        }
    }

    pub fn generate(&self, object: &K) -> Vec<Sample> {
        (self.generate)(object)
    }
}

impl<K> std::fmt::Debug for FamilyGenerator<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FamilyGenerator")
            .field("desc", &self.desc)
            .finish_non_exhaustive()
    }
}

/// Ordered table of family generators for one object kind
#[derive(Debug)]
pub struct GeneratorSet<K> {
    kind: &'static str,
    generators: Vec<FamilyGenerator<K>>,
}

impl<K> GeneratorSet<K> {
    pub fn new(kind: &'static str, generators: Vec<FamilyGenerator<K>>) -> Self {
        Self { kind, generators }
    }

    /// Drop every generator whose family is disabled by the filter
    pub fn filtered(mut self, filter: &FamilyFilter) -> Self {
        self.generators.retain(|g| filter.is_enabled(g.desc.name));
        self
    }

    /// Object kind this table generates for (e.g. `pod`)
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn descs(&self) -> impl Iterator<Item = &FamilyDesc> {
        self.generators.iter().map(|g| &g.desc)
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Run every generator over one object, appending to the accumulator
    pub fn generate_into(&self, object: &K, acc: &mut FamilyAccumulator) {
        for generator in &self.generators {
            let samples = generator.generate(object);
            if !samples.is_empty() {
                acc.extend(&generator.desc, samples);
            }
        }
    }
}
