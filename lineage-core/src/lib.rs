//! Lineage Core - compiles data-lineage observations into a process dependency graph.
//!
//! Input is a flat list of observations ("program P touched object T with
//! operation O"). Output is a scheduling graph: one process per program,
//! placeholder processes for tables nobody was seen writing, and for each
//! process the set of processes it must wait for.
//!
//! # Stages
//!
//! - **Normalization** ([`normalize`]): canonical keys for paths and table names
//! - **Writer classification** ([`classify`]): operation keywords, then a file-name heuristic
//! - **Process registry** ([`registry`]): stable `proc_NNNN` ids, orphan synthesis
//! - **Dependency resolution** ([`resolve`]): reads mapped to writers through a fallback chain
//! - **Assembly** ([`assemble`]): dependency rows plus the table/writer audit
//! - **Cycle detection** ([`cycles`]) and **scheduling** ([`schedule`]) over the result
//!
//! # Usage
//!
//! ```rust
//! use lineage_core::{detect_cycles, ClassifierRules, ObservationRecord, Pipeline};
//!
//! let records = vec![
//!     ObservationRecord::new("etl/load_orders.sql", "dw.orders", Some("INSERT")),
//!     ObservationRecord::new("etl/report.sql", "dw.orders", Some("SELECT")),
//! ];
//!
//! let graph = Pipeline::new(ClassifierRules::default())?.run(&records)?;
//! assert_eq!(graph.processes[1].depends_on[0].to_string(), "proc_0001");
//!
//! let deps = graph.dependency_graph();
//! assert!(detect_cycles(&deps).is_acyclic());
//! assert_eq!(deps.execution_plan()?.stages.len(), 2);
//! # Ok::<(), lineage_core::LineageError>(())
//! ```

pub mod assemble;
pub mod classify;
pub mod cycles;
pub mod error;
pub mod graph;
pub mod input;
pub mod normalize;
pub mod pipeline;
pub mod registry;
pub mod resolve;
pub mod schedule;
pub mod types;

pub use assemble::{LineageGraph, PipelineSummary};
pub use classify::{ClassifierRules, WriterClassifier, WriterIndex};
pub use cycles::{detect_cycles, Cycle, CycleReport};
pub use error::{LineageError, Result};
pub use graph::DependencyGraph;
pub use input::{read_control_table, read_observations, InputFormat};
pub use pipeline::Pipeline;
pub use schedule::ExecutionPlan;
pub use types::{
    ObservationRecord, Process, ProcessId, ProcessOrigin, ProcessRow, TableWriters, WriterSource,
};
