//! Execution ordering.
//!
//! Groups processes into stages so that every process runs after all of
//! its dependencies. Roots (no dependencies) form stage 0; every other
//! process lands one stage after its latest dependency.

use petgraph::algo::toposort;
use petgraph::Direction;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{LineageError, Result};
use crate::graph::DependencyGraph;
use crate::types::ProcessId;

/// Stages of processes that can run once the previous stages are done.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionPlan {
    /// Each stage sorted by id.
    pub stages: Vec<Vec<ProcessId>>,
}

impl ExecutionPlan {
    /// Total number of scheduled processes.
    pub fn len(&self) -> usize {
        self.stages.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Zero-based stage of a process, if scheduled.
    pub fn stage_of(&self, id: ProcessId) -> Option<usize> {
        self.stages.iter().position(|stage| stage.binary_search(&id).is_ok())
    }

    /// All processes, stage by stage.
    pub fn ordered(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.stages.iter().flatten().copied()
    }
}

impl DependencyGraph {
    /// Order the graph into stages, dependencies first.
    ///
    /// Dependencies without a row of their own are scheduled as roots.
    /// Fails with [`LineageError::Cyclic`] when no order exists.
    pub fn execution_plan(&self) -> Result<ExecutionPlan> {
        let (digraph, _) = self.to_digraph();

        // Edges run dependent -> dependency, so toposort lists dependents first.
        let mut order = toposort(&digraph, None).map_err(|cycle| LineageError::Cyclic {
            process: digraph[cycle.node_id()],
        })?;
        order.reverse();

        let mut stage_of: HashMap<_, usize> = HashMap::with_capacity(order.len());
        let mut stages: Vec<Vec<ProcessId>> = Vec::new();
        for node in order {
            let stage = digraph
                .neighbors_directed(node, Direction::Outgoing)
                .filter_map(|dep| stage_of.get(&dep))
                .map(|s| s + 1)
                .max()
                .unwrap_or(0);
            stage_of.insert(node, stage);
            if stages.len() <= stage {
                stages.resize_with(stage + 1, Vec::new);
            }
            stages[stage].push(digraph[node]);
        }

        for stage in &mut stages {
            stage.sort();
        }
        debug!(
            "Execution plan: {} processes in {} stages",
            stage_of.len(),
            stages.len()
        );
        Ok(ExecutionPlan { stages })
    }
}
