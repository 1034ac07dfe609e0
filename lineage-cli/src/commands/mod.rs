//! Command implementations for the lineage CLI
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod build;
pub mod cycles;
pub mod graph;
pub mod order;
pub mod writers;

use anyhow::{Context, Result};
use lineage_core::{read_observations, LineageGraph, Pipeline};
use std::path::Path;

use crate::config::LineageConfig;
use crate::output::OutputConfig;

/// Settings shared by every command.
pub struct CommandContext {
    pub config: LineageConfig,
    pub output: OutputConfig,
}

impl CommandContext {
    /// Read an observation table and compile it.
    pub fn compile(&self, input: &Path) -> Result<LineageGraph> {
        let records = read_observations(input)
            .with_context(|| format!("Failed to read observations from {}", input.display()))?;
        let pipeline = Pipeline::new(self.config.classifier.clone())
            .context("Invalid [classifier] configuration")?;
        pipeline
            .run(&records)
            .with_context(|| format!("Failed to compile {}", input.display()))
    }
}
