//! Cycles command - detect circular dependencies
//!
//! Works on an observation table (compiled first) or on a dependency table
//! previously written by `lineage build`.

use anyhow::{Context, Result};
use colored::Colorize;
use lineage_core::{detect_cycles, read_control_table, CycleReport, DependencyGraph};
use serde::Serialize;
use std::path::Path;
use tracing::warn;

use super::CommandContext;
use crate::output::{Column, CsvOutput, Output, OutputConfig, Outputter};

/// Cycle check result
#[derive(Debug, Serialize)]
pub struct CycleResult {
    pub acyclic: bool,
    pub total_cycles: usize,
    pub processes_in_cycles: usize,
    #[serde(flatten)]
    pub report: CycleReport,
    /// Process names along each cycle, parallel to `cycles`.
    #[serde(skip)]
    names: Vec<String>,
}

#[derive(Serialize)]
struct CycleRow {
    cycle: usize,
    path: String,
}

impl CycleResult {
    pub fn new(report: CycleReport, graph: &DependencyGraph) -> Self {
        let names = report
            .cycles
            .iter()
            .map(|cycle| {
                cycle
                    .path()
                    .iter()
                    .map(|id| match graph.name_of(*id) {
                        Some(name) if !name.is_empty() => name.to_string(),
                        _ => id.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(" -> ")
            })
            .collect();

        Self {
            acyclic: report.is_acyclic(),
            total_cycles: report.cycles.len(),
            processes_in_cycles: report.processes_in_cycles(),
            report,
            names,
        }
    }
}

impl Outputter for CycleResult {
    fn to_table(&self, _config: &OutputConfig) -> String {
        let mut output = String::new();

        output.push_str(&format!("{}\n", "Dependency Cycles".bold()));
        output.push_str(&format!("{}\n", "-".repeat(60)));

        if self.acyclic {
            output.push_str(&format!(
                "\n  {} No cycles found. Dependency graph is valid.\n",
                "OK".green().bold()
            ));
            return output;
        }

        output.push_str(&format!(
            "\n  {} Cycles found in dependency graph:\n\n",
            "WARNING".yellow().bold()
        ));
        for (i, (cycle, names)) in self.report.cycles.iter().zip(&self.names).enumerate() {
            output.push_str(&format!("  {}. {}\n", i + 1, cycle));
            output.push_str(&format!("     {}\n", names.dimmed()));
        }

        output.push_str(&format!(
            "\n{}: {} cycles, {} processes in {} cyclic groups\n",
            "Summary".bold(),
            self.total_cycles,
            self.processes_in_cycles,
            self.report.components.len()
        ));
        output
    }

    fn to_csv(&self, config: &OutputConfig) -> String {
        let rows: Vec<CycleRow> = self
            .report
            .cycles
            .iter()
            .enumerate()
            .map(|(i, cycle)| CycleRow {
                cycle: i + 1,
                path: cycle.to_string(),
            })
            .collect();
        let columns = vec![Column::new("cycle", "cycle"), Column::new("path", "path")];
        CsvOutput::format_with_columns(&rows, &columns, config)
    }
}

/// Load the graph to check: a control table as-is, or a compiled observation table.
fn load_graph(ctx: &CommandContext, file: &Path, control_table: bool) -> Result<DependencyGraph> {
    if !control_table {
        return Ok(ctx.compile(file)?.dependency_graph());
    }

    let rows = read_control_table(file)
        .with_context(|| format!("Failed to read control table {}", file.display()))?;
    let graph = DependencyGraph::from_rows(&rows);
    for (from, to) in graph.dangling_references() {
        warn!("{} depends on {}, which has no row of its own", from, to);
    }
    Ok(graph)
}

/// Run the cycles command
///
/// Returns `true` when the caller should exit with a failure status.
pub fn run(ctx: &CommandContext, file: &Path, control_table: bool, fail_on_cycle: bool) -> Result<bool> {
    let graph = load_graph(ctx, file, control_table)?;
    let result = CycleResult::new(detect_cycles(&graph), &graph);
    let failed = fail_on_cycle && !result.acyclic;

    Output::with_config(result, ctx.output.clone()).render()?;
    Ok(failed)
}
