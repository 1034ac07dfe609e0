//! Writers command - print the table/writer audit
//!
//! Shows, for every table in the input, which processes were taken to write
//! it and how that was decided (keyword, file name, or orphan placeholder).

use anyhow::Result;
use lineage_core::TableWriters;
use std::path::Path;

use super::CommandContext;
use crate::output::{AsTable, Column, Output, Rows};

impl AsTable for TableWriters {
    fn columns() -> Vec<Column> {
        vec![
            Column::new("Table", "table"),
            Column::new("Short Name", "table_short"),
            Column::new("Writer IDs", "writer_process_ids"),
            Column::new("Writer Names", "writer_process_names"),
            Column::new("Source", "source"),
        ]
    }
}

/// Run the writers command
pub fn run(ctx: &CommandContext, input: &Path) -> Result<()> {
    let graph = ctx.compile(input)?;
    Output::with_config(Rows(graph.tables), ctx.output.clone()).render()
}
