//! Dependency resolution.
//!
//! For every real process, collect the tables it reads and map each one to
//! the process(es) that write it. The lookup walks a fallback chain and
//! stops at the first step that yields anything:
//!
//! 1. writers recorded in the [`WriterIndex`]
//! 2. the orphan the registry synthesized for the table
//! 3. any registered process whose basename contains the table's short name
//! 4. a new orphan, created on the spot
//!
//! Step 4 is the only place the registry is written after it is built.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use crate::classify::{distinct_programs, WriterClassifier, WriterIndex};
use crate::normalize::{basename, short_name};
use crate::registry::Registry;
use crate::types::{Observation, Process, ProcessId, ProcessOrigin, ProcessRow};

/// Which fallback step answered a read lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStep {
    Writer,
    Orphan,
    NameScan,
    LateOrphan,
}

/// How many read lookups each fallback step answered.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    pub writer: usize,
    pub orphan: usize,
    pub name_scan: usize,
    pub late_orphan: usize,
}

impl ResolutionStats {
    fn record(&mut self, step: ResolutionStep) {
        match step {
            ResolutionStep::Writer => self.writer += 1,
            ResolutionStep::Orphan => self.orphan += 1,
            ResolutionStep::NameScan => self.name_scan += 1,
            ResolutionStep::LateOrphan => self.late_orphan += 1,
        }
    }
}

/// Dependency rows for real processes plus lookup statistics.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// One row per real process, in registry order.
    pub rows: Vec<ProcessRow>,
    pub stats: ResolutionStats,
}

pub struct Resolver<'a> {
    classifier: &'a WriterClassifier,
    index: &'a WriterIndex,
}

impl<'a> Resolver<'a> {
    pub fn new(classifier: &'a WriterClassifier, index: &'a WriterIndex) -> Self {
        Self { classifier, index }
    }

    /// Tables read by each program, keyed by normalized program.
    pub fn read_sets<'o>(&self, observations: &'o [Observation]) -> HashMap<&'o str, BTreeSet<&'o str>> {
        let mut reads: HashMap<&str, BTreeSet<&str>> = HashMap::new();
        for obs in observations {
            if obs.program.is_empty() || obs.object.is_empty() {
                continue;
            }
            if self.classifier.is_read(&obs.operation) {
                reads.entry(&obs.program).or_default().insert(&obs.object);
            }
        }
        reads
    }

    /// Writer ids for one table, walking the fallback chain.
    pub fn resolve_table(&self, registry: &mut Registry, table: &str) -> (Vec<ProcessId>, ResolutionStep) {
        let writers = registry.writers_of(table, self.index);
        if !writers.is_empty() {
            return (writers, ResolutionStep::Writer);
        }

        if let Some(orphan) = registry.orphan_for(table) {
            return (vec![orphan], ResolutionStep::Orphan);
        }

        let short = short_name(table);
        if !short.is_empty() {
            let found: Vec<ProcessId> = registry
                .processes()
                .iter()
                .filter(|p| scan_name(p).contains(short))
                .map(|p| p.id)
                .collect();
            if !found.is_empty() {
                debug!("{} resolved by name scan to {} process(es)", table, found.len());
                return (found, ResolutionStep::NameScan);
            }
        }

        let (orphan, _) = registry.ensure_orphan(table);
        warn!("Synthesized late orphan {} for unregistered table {}", orphan, table);
        (vec![orphan], ResolutionStep::LateOrphan)
    }

    /// Compute `depends_on` for every real process.
    pub fn resolve(&self, observations: &[Observation], registry: &mut Registry) -> Resolution {
        let reads = self.read_sets(observations);
        let mut resolution = Resolution::default();

        for (program, _) in distinct_programs(observations) {
            let Some(pid) = registry.process_for(program) else {
                warn!("Program {} has no registered process; skipping", program);
                continue;
            };

            let mut depends = BTreeSet::new();
            if let Some(tables) = reads.get(program) {
                for table in tables {
                    let (ids, step) = self.resolve_table(registry, table);
                    resolution.stats.record(step);
                    depends.extend(ids);
                }
            }
            depends.remove(&pid);

            let process_name = registry
                .name_of(pid)
                .map(str::to_string)
                .unwrap_or_default();
            resolution.rows.push(ProcessRow {
                process_id: pid,
                process_name,
                depends_on: depends.into_iter().collect(),
            });
        }

        resolution
    }
}

/// Name a process is matched by in the name scan.
///
/// Real processes use the basename of their program key, which is empty
/// when the path has no file name. Orphans use their synthesized name.
fn scan_name(process: &Process) -> String {
    match &process.origin {
        ProcessOrigin::Real { program } => basename(program),
        ProcessOrigin::Orphan { .. } => process.name.clone(),
    }
}
