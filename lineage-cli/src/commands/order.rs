//! Order command - print an execution plan
//!
//! Processes are grouped into stages; everything in a stage can run once
//! all earlier stages have finished.

use anyhow::{Context, Result};
use lineage_core::{ExecutionPlan, ProcessId};
use serde::Serialize;
use std::path::Path;

use super::CommandContext;
use crate::output::{Alignment, AsTable, Column, Output, Rows};

/// One scheduled process
#[derive(Debug, Serialize)]
pub struct StageRow {
    pub stage: usize,
    pub process_id: ProcessId,
    pub process_name: String,
}

impl AsTable for StageRow {
    fn columns() -> Vec<Column> {
        vec![
            Column::new("Stage", "stage").with_alignment(Alignment::Right),
            Column::new("Process ID", "process_id"),
            Column::new("Name", "process_name"),
        ]
    }
}

fn stage_rows(plan: &ExecutionPlan, name_of: impl Fn(ProcessId) -> String) -> Vec<StageRow> {
    plan.stages
        .iter()
        .enumerate()
        .flat_map(|(stage, ids)| {
            ids.iter().map(move |id| (stage, *id))
        })
        .map(|(stage, process_id)| StageRow {
            stage,
            process_id,
            process_name: name_of(process_id),
        })
        .collect()
}

/// Run the order command
pub fn run(ctx: &CommandContext, input: &Path) -> Result<()> {
    let graph = ctx.compile(input)?.dependency_graph();
    let plan = graph
        .execution_plan()
        .context("Cannot order processes; run `lineage cycles` for details")?;

    let rows = stage_rows(&plan, |id| graph.name_of(id).unwrap_or_default().to_string());
    Output::with_config(Rows(rows), ctx.output.clone()).render()
}
