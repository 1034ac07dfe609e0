//! Error types for lineage-core.

use thiserror::Error;

use crate::types::ProcessId;

/// Result type alias for lineage-core operations.
pub type Result<T> = std::result::Result<T, LineageError>;

/// Errors that can occur while reading observations or compiling the graph.
///
/// Data-quality problems (empty program or object cells, tables without a
/// known writer) are not errors; they are absorbed by the pipeline.
#[derive(Error, Debug)]
pub enum LineageError {
    /// The input table lacks a required column.
    #[error("Input table must contain {missing} column(s) (case-insensitive); found: [{}]", found.join(", "))]
    MissingColumns {
        /// Role names that could not be matched, e.g. "program, object".
        missing: String,
        /// Header names present in the input.
        found: Vec<String>,
    },

    /// Input file extension is not one we know how to read.
    #[error("Unsupported input format: {path} (expected .csv, .tsv or .json)")]
    UnsupportedFormat {
        /// Path of the rejected file.
        path: String,
    },

    /// A classifier pattern failed to compile.
    #[error("Invalid token pattern '{pattern}': {message}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Compiler diagnostic.
        message: String,
    },

    /// A process id did not have the `proc_NNNN` shape.
    #[error("Invalid process id: '{0}'")]
    InvalidProcessId(String),

    /// The graph cannot be ordered because it contains a cycle.
    #[error("Dependency graph is cyclic: {process} is part of a cycle")]
    Cyclic {
        /// A process known to sit on a cycle.
        process: ProcessId,
    },

    /// Row in a JSON input was not an object.
    #[error("JSON input must be an array of objects (row {row} is not an object)")]
    MalformedJson {
        /// Zero-based row index.
        row: usize,
    },

    /// IO error reading input files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV decoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON decoding error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}
