//! End-to-end compilation of observations into a [`LineageGraph`].

use tracing::{info, warn};

use crate::assemble::{assemble, LineageGraph};
use crate::classify::{ClassifierRules, WriterClassifier};
use crate::error::Result;
use crate::normalize::observation;
use crate::registry::Registry;
use crate::resolve::Resolver;
use crate::types::{Observation, ObservationRecord};

/// A configured lineage compiler.
///
/// Construction validates the classifier rules; [`Pipeline::run`] is pure
/// over its input and can be called any number of times.
#[derive(Debug)]
pub struct Pipeline {
    classifier: WriterClassifier,
}

impl Pipeline {
    pub fn new(rules: ClassifierRules) -> Result<Self> {
        Ok(Self {
            classifier: WriterClassifier::new(rules)?,
        })
    }

    /// Normalize, classify, register, resolve and assemble.
    pub fn run(&self, records: &[ObservationRecord]) -> Result<LineageGraph> {
        let observations: Vec<Observation> = records.iter().map(observation).collect();

        let incomplete = observations
            .iter()
            .filter(|obs| obs.program.is_empty() || obs.object.is_empty())
            .count();
        if incomplete > 0 {
            warn!(
                "{} of {} rows have an empty program or object and contribute no edges",
                incomplete,
                observations.len()
            );
        }

        let index = self.classifier.classify(&observations);
        let mut registry = Registry::build(&observations, &index);
        let resolution = Resolver::new(&self.classifier, &index).resolve(&observations, &mut registry);
        let graph = assemble(resolution, &registry, &index, &observations);

        info!(
            "Compiled {} observations into {} processes ({} orphans) with {} edges",
            graph.summary.observations,
            graph.summary.processes,
            graph.summary.orphans + graph.summary.late_orphans,
            graph.summary.edges
        );
        Ok(graph)
    }
}
