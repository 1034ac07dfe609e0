//! Build command - compile observations and write both output tables
//!
//! Writes `control_table_dependencies_<ts>.csv` (one row per process) and
//! `table_writer_map_<ts>.csv` (one row per table). Both files are rendered
//! in memory first so a failure never leaves a single half-written pair.

use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;
use lineage_core::{detect_cycles, PipelineSummary, ProcessRow, TableWriters};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::cycles::CycleResult;
use super::CommandContext;
use crate::output::{AsTable, CsvOutput, Output, OutputConfig, OutputFormat, Outputter, TableOutput};

/// `strftime` pattern appended to output file names.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

const CONTROL_TABLE_STEM: &str = "control_table_dependencies";
const WRITER_MAP_STEM: &str = "table_writer_map";

/// Options for the build command
#[derive(Debug)]
pub struct BuildOptions {
    pub input: PathBuf,
    pub out_dir: Option<PathBuf>,
    pub no_timestamp: bool,
    pub check_cycles: bool,
}

/// Build result
#[derive(Debug, Serialize)]
pub struct BuildResult {
    pub input: String,
    pub control_table: String,
    pub writer_map: String,
    pub summary: PipelineSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cycles: Option<CycleResult>,
}

impl BuildResult {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let s = &self.summary;
        let mut pairs = vec![
            ("Input", self.input.clone()),
            ("Control table", self.control_table.clone()),
            ("Writer map", self.writer_map.clone()),
            ("Observations", s.observations.to_string()),
            ("Programs", s.programs.to_string()),
            ("Tables", s.tables.to_string()),
            ("Processes", s.processes.to_string()),
            ("Orphans", (s.orphans + s.late_orphans).to_string()),
            ("Edges", s.edges.to_string()),
            (
                "Lookups",
                format!(
                    "writer {}, orphan {}, name scan {}, late orphan {}",
                    s.lookups.writer, s.lookups.orphan, s.lookups.name_scan, s.lookups.late_orphan
                ),
            ),
        ];
        if let Some(cycles) = &self.cycles {
            pairs.push(("Cycles", cycles.total_cycles.to_string()));
        }
        pairs
    }
}

impl Outputter for BuildResult {
    fn to_table(&self, config: &OutputConfig) -> String {
        let mut output = format!("{} {}\n", "SUCCESS:".green().bold(), "Dependency graph built");
        output.push_str(&TableOutput::format_key_value(&self.pairs(), config));
        if let Some(cycles) = &self.cycles {
            output.push_str("\n\n");
            output.push_str(&cycles.to_table(config));
        }
        output
    }

    fn to_csv(&self, _config: &OutputConfig) -> String {
        CsvOutput::format_pairs(&self.pairs())
    }
}

/// Output file path for a stem, with an optional timestamp suffix.
fn output_path(dir: &Path, stem: &str, stamp: Option<&str>) -> PathBuf {
    match stamp {
        Some(ts) => dir.join(format!("{}_{}.csv", stem, ts)),
        None => dir.join(format!("{}.csv", stem)),
    }
}

/// Run the build command
pub fn run(ctx: &CommandContext, opts: BuildOptions) -> Result<()> {
    let graph = ctx.compile(&opts.input)?;

    let file_config = OutputConfig::new(OutputFormat::Csv)
        .without_colors()
        .without_truncation();
    let control_csv =
        CsvOutput::format_with_columns(&graph.processes, &ProcessRow::csv_columns(), &file_config);
    let map_csv =
        CsvOutput::format_with_columns(&graph.tables, &TableWriters::csv_columns(), &file_config);

    let dir = opts
        .out_dir
        .unwrap_or_else(|| ctx.config.output_directory());
    let stamp = (!opts.no_timestamp && ctx.config.timestamp_outputs())
        .then(|| Local::now().format(TIMESTAMP_FORMAT).to_string());
    let control_path = output_path(&dir, CONTROL_TABLE_STEM, stamp.as_deref());
    let map_path = output_path(&dir, WRITER_MAP_STEM, stamp.as_deref());

    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    fs::write(&control_path, control_csv + "\n")
        .with_context(|| format!("Failed to write {}", control_path.display()))?;
    fs::write(&map_path, map_csv + "\n")
        .with_context(|| format!("Failed to write {}", map_path.display()))?;
    info!(
        "Wrote {} and {}",
        control_path.display(),
        map_path.display()
    );

    let cycles = opts.check_cycles.then(|| {
        let deps = graph.dependency_graph();
        CycleResult::new(detect_cycles(&deps), &deps)
    });

    let result = BuildResult {
        input: opts.input.display().to_string(),
        control_table: control_path.display().to_string(),
        writer_map: map_path.display().to_string(),
        summary: graph.summary,
        cycles,
    };
    Output::with_config(result, ctx.output.clone()).render()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path() {
        let dir = Path::new("out");
        assert_eq!(
            output_path(dir, CONTROL_TABLE_STEM, Some("20250101_120000")),
            PathBuf::from("out/control_table_dependencies_20250101_120000.csv")
        );
        assert_eq!(
            output_path(dir, WRITER_MAP_STEM, None),
            PathBuf::from("out/table_writer_map.csv")
        );
    }

    #[test]
    fn test_timestamp_format_shape() {
        let stamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
        assert_eq!(stamp.len(), 15);
        assert_eq!(stamp.as_bytes()[8], b'_');
    }
}
