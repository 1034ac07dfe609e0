//! Lineage CLI - Command-line interface for the lineage dependency-graph compiler
//!
//! Turns a program/object lineage export into a process dependency table
//! that a scheduler can consume, and checks the result for cycles.

use clap::{CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::build::BuildOptions;
use commands::{build, cycles, graph, order, writers, CommandContext};
use config::LineageConfig;
use output::{OutputConfig, OutputFormat};

/// Exit status when `--fail-on-cycle` is given and cycles exist.
const CYCLE_EXIT_CODE: u8 = 2;

/// Compile data-lineage observations into a process dependency graph.
///
/// Reads a table of (program, object, operation) rows, infers which
/// program writes each table, and emits one row per process listing the
/// processes it depends on.
#[derive(Parser)]
#[command(name = "lineage")]
#[command(author, version)]
#[command(about = "Compile data-lineage observations into a process dependency graph")]
#[command(propagate_version = true)]
#[command(next_help_heading = "Options")]
#[command(after_help = "Quick Start:
  lineage build lineage.csv           Write control table and writer map
  lineage graph lineage.csv           Print the dependency table
  lineage cycles lineage.csv          Check for circular dependencies

Examples:
  lineage build xref.tsv -o out --check-cycles
  lineage cycles out/control_table_dependencies.csv --control-table --fail-on-cycle
  lineage order lineage.json --format json")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Config file (defaults to ./.lineagerc.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile observations and write the control table and writer map
    #[command(visible_alias = "b")]
    Build {
        /// Observation table (.csv, .tsv or .json)
        input: PathBuf,

        /// Directory for the output files (default: config or current directory)
        #[arg(short = 'o', long)]
        out_dir: Option<PathBuf>,

        /// Omit the timestamp from output file names
        #[arg(long)]
        no_timestamp: bool,

        /// Also report dependency cycles
        #[arg(long)]
        check_cycles: bool,
    },

    /// Print the dependency table (one row per process)
    Graph {
        /// Observation table (.csv, .tsv or .json)
        input: PathBuf,
    },

    /// Print the table -> writer process map
    Writers {
        /// Observation table (.csv, .tsv or .json)
        input: PathBuf,
    },

    /// Detect circular dependencies
    Cycles {
        /// Observation table, or a control table with --control-table
        file: PathBuf,

        /// Treat the file as a previously written dependency table
        #[arg(long)]
        control_table: bool,

        /// Exit with status 2 when cycles are found
        #[arg(long)]
        fail_on_cycle: bool,
    },

    /// Print an execution plan grouped into stages
    Order {
        /// Observation table (.csv, .tsv or .json)
        input: PathBuf,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    // Load configuration from --config or .lineagerc.toml
    let config = match &cli.config {
        Some(path) => LineageConfig::load_file(path)?,
        None => LineageConfig::load(Path::new(".")),
    };

    // Resolve output format: CLI flag > config default > Table
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| match f.parse() {
                Ok(format) => Some(format),
                Err(e) => {
                    tracing::warn!("Ignoring [output] format: {}", e);
                    None
                }
            })
            .unwrap_or(OutputFormat::Table)
    });

    // Apply color override from config if set
    if let Some(use_color) = config.use_color() {
        colored::control::set_override(use_color);
    }

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            // Print help if no command provided
            let _ = Cli::command().print_help();
            println!();
            return Ok(ExitCode::SUCCESS);
        }
    };

    let ctx = CommandContext {
        output: OutputConfig::auto_detect_with_color_override(format, config.use_color()),
        config,
    };

    match command {
        Commands::Build {
            input,
            out_dir,
            no_timestamp,
            check_cycles,
        } => build::run(
            &ctx,
            BuildOptions {
                input,
                out_dir,
                no_timestamp,
                check_cycles,
            },
        )?,
        Commands::Graph { input } => graph::run(&ctx, &input)?,
        Commands::Writers { input } => writers::run(&ctx, &input)?,
        Commands::Cycles {
            file,
            control_table,
            fail_on_cycle,
        } => {
            if cycles::run(&ctx, &file, control_table, fail_on_cycle)? {
                return Ok(ExitCode::from(CYCLE_EXIT_CODE));
            }
        }
        Commands::Order { input } => order::run(&ctx, &input)?,
    }

    Ok(ExitCode::SUCCESS)
}
