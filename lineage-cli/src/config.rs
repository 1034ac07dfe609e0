//! Configuration loading from `.lineagerc.toml`.
//!
//! Configuration is optional: without a file every setting falls back to
//! its default, and command-line flags override whatever the file says.
//!
//! # Example Configuration
//!
//! ```toml
//! [classifier]
//! writer_keywords = ["create", "insert", "truncate", "write", "update", "drop", "select into"]
//! read_keywords = ["read", "select"]
//! token_pattern = "[^0-9a-zA-Z_]+"
//! substring_match = true
//!
//! [output]
//! format = "table"
//! color = true
//! directory = "out"
//! timestamp = true
//! ```

use anyhow::{Context, Result};
use lineage_core::ClassifierRules;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".lineagerc.toml";

/// Root configuration structure.
///
/// All sections are optional and will use defaults if not specified.
#[derive(Debug, Deserialize, Default)]
pub struct LineageConfig {
    /// Writer/read keywords and the file-name matching rule.
    #[serde(default)]
    pub classifier: ClassifierRules,

    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,
}

/// Output formatting preferences.
///
/// Command-line flags (e.g., `--format json`) override these settings.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// Default output format: `table`, `json` or `csv`.
    #[serde(default)]
    pub format: Option<String>,

    /// Whether to use colored output.
    ///
    /// Defaults to `true` when stdout is a TTY.
    #[serde(default)]
    pub color: Option<bool>,

    /// Default output directory for `build`.
    #[serde(default)]
    pub directory: Option<String>,

    /// Whether `build` stamps output file names with the run time.
    #[serde(default)]
    pub timestamp: Option<bool>,
}

impl LineageConfig {
    /// Load configuration from `.lineagerc.toml` in the given directory.
    ///
    /// If the config file doesn't exist or can't be parsed, returns defaults.
    /// Parse errors are logged as warnings but don't cause failures.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Self::read_lenient(&config_path);
        }
        Self::default()
    }

    /// Load an explicitly requested config file.
    ///
    /// The file must exist; a parse failure still falls back to defaults.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        Ok(Self::read_lenient(path))
    }

    fn read_lenient(path: &Path) -> Self {
        match Self::read(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{:#}; using defaults", e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Get the default output format, if configured.
    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    /// Colored output override, or `None` to use auto-detection.
    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }

    /// Output directory for `build`, defaulting to the working directory.
    pub fn output_directory(&self) -> PathBuf {
        self.output
            .directory
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Whether output file names carry a timestamp (default `true`).
    pub fn timestamp_outputs(&self) -> bool {
        self.output.timestamp.unwrap_or(true)
    }
}
