//! Graph command - print the dependency table
//!
//! One row per process: its id, name and the processes it waits for.

use anyhow::Result;
use lineage_core::ProcessRow;
use std::path::Path;

use super::CommandContext;
use crate::output::{AsTable, Column, Output, Rows};

impl AsTable for ProcessRow {
    fn columns() -> Vec<Column> {
        vec![
            Column::new("Process ID", "process_id"),
            Column::new("Name", "process_name").with_max_width(40),
            Column::new("Depends On", "depends_on"),
        ]
    }
}

/// Run the graph command
pub fn run(ctx: &CommandContext, input: &Path) -> Result<()> {
    let graph = ctx.compile(input)?;
    Output::with_config(Rows(graph.processes), ctx.output.clone()).render()
}
