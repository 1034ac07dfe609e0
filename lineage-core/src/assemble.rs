//! Graph assembly.
//!
//! Merges the resolver's rows with the registry so every known process has
//! exactly one row, and builds the table/writer audit.

use serde::Serialize;
use std::collections::HashSet;

use crate::classify::{distinct_programs, distinct_tables, WriterIndex};
use crate::graph::DependencyGraph;
use crate::normalize::short_name;
use crate::registry::Registry;
use crate::resolve::{Resolution, ResolutionStats};
use crate::types::{Observation, ProcessRow, TableWriters, WriterSource};

/// Counts describing one pipeline run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub observations: usize,
    pub programs: usize,
    pub tables: usize,
    /// Orphans from the registry pass.
    pub orphans: usize,
    /// Orphans the resolver had to create on the fly.
    pub late_orphans: usize,
    pub processes: usize,
    pub edges: usize,
    pub lookups: ResolutionStats,
}

/// The complete artifact of one run: dependency rows, audit rows, counts.
#[derive(Clone, Debug, Serialize)]
pub struct LineageGraph {
    /// One row per process, sorted by id.
    pub processes: Vec<ProcessRow>,
    /// One row per input table, sorted by table key.
    pub tables: Vec<TableWriters>,
    pub summary: PipelineSummary,
}

impl LineageGraph {
    /// The graph view consumed by cycle detection and scheduling.
    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::from_rows(&self.processes)
    }
}

/// Complete the resolver's rows and derive the audit table.
pub fn assemble(
    resolution: Resolution,
    registry: &Registry,
    index: &WriterIndex,
    observations: &[Observation],
) -> LineageGraph {
    let Resolution { mut rows, stats } = resolution;
    let mut seen: HashSet<_> = rows.iter().map(|r| r.process_id).collect();

    // Registry-pass orphans first, then anything left (late orphans, or
    // programs the resolver skipped).
    let orphan_ids = registry.orphans().map(|(_, id)| id);
    let all_ids = registry.processes().iter().map(|p| p.id);
    for id in orphan_ids.chain(all_ids).collect::<Vec<_>>() {
        if seen.insert(id) {
            rows.push(ProcessRow {
                process_id: id,
                process_name: registry.name_of(id).unwrap_or_default().to_string(),
                depends_on: Vec::new(),
            });
        }
    }
    rows.sort_by_key(|r| r.process_id);

    let tables: Vec<TableWriters> = distinct_tables(observations)
        .into_iter()
        .map(|table| audit_row(table, registry, index))
        .collect();

    let orphans = registry.orphans().count();
    let summary = PipelineSummary {
        observations: observations.len(),
        programs: distinct_programs(observations).len(),
        tables: tables.len(),
        orphans: orphans - stats.late_orphan,
        late_orphans: stats.late_orphan,
        processes: rows.len(),
        edges: rows.iter().map(|r| r.depends_on.len()).sum(),
        lookups: stats,
    };

    LineageGraph {
        processes: rows,
        tables,
        summary,
    }
}

fn audit_row(table: &str, registry: &Registry, index: &WriterIndex) -> TableWriters {
    let writers = registry.writers_of(table, index);
    let (ids, source) = if writers.is_empty() {
        let ids = registry.orphan_for(table).into_iter().collect();
        (ids, WriterSource::Orphan)
    } else {
        let source = index
            .writers(table)
            .map(|set| set.source)
            .unwrap_or(WriterSource::Keyword);
        (writers, source)
    };

    TableWriters {
        table: table.to_string(),
        table_short: short_name(table).to_string(),
        writer_process_names: ids
            .iter()
            .map(|id| registry.name_of(*id).unwrap_or_default().to_string())
            .collect(),
        writer_process_ids: ids,
        source,
    }
}
