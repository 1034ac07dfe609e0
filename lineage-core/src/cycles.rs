//! Cycle detection over the dependency graph.
//!
//! Two complementary views:
//!
//! - **Witness paths**: a depth-first walk from every node reports each
//!   back edge it meets as a concrete path `p0 -> ... -> p0`. The walk is
//!   driven by an explicit stack, and every frame owns its own copy of the
//!   path so far, so deep chains cannot overflow the call stack and
//!   sibling branches never share path state.
//! - **Components**: strongly connected components via petgraph's
//!   Kosaraju. The pruned walk reports one witness per back edge it finds;
//!   components list every process that sits on any cycle.

use petgraph::algo::kosaraju_scc;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::debug;

use crate::graph::DependencyGraph;
use crate::types::ProcessId;

/// A closed path: the first id is repeated at the end.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cycle(Vec<ProcessId>);

impl Cycle {
    /// Rotate an open loop `[a, b, c]` so its smallest id leads, then close it.
    fn canonical(mut open: Vec<ProcessId>) -> Self {
        if let Some(min_pos) = open
            .iter()
            .enumerate()
            .min_by_key(|(_, id)| **id)
            .map(|(pos, _)| pos)
        {
            open.rotate_left(min_pos);
        }
        if let Some(first) = open.first().copied() {
            open.push(first);
        }
        Cycle(open)
    }

    /// Ids along the cycle, starting and ending at the same process.
    pub fn path(&self) -> &[ProcessId] {
        &self.0
    }

    /// Number of distinct processes on the cycle.
    pub fn len(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: ProcessId) -> bool {
        self.0.contains(&id)
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ProcessId::to_string).collect();
        f.write_str(&parts.join(" -> "))
    }
}

impl Serialize for Cycle {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of a cycle check.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CycleReport {
    /// Distinct witness paths, sorted.
    pub cycles: Vec<Cycle>,
    /// Strongly connected components that contain a cycle, each sorted,
    /// ordered by their smallest id.
    pub components: Vec<Vec<ProcessId>>,
}

impl CycleReport {
    pub fn is_acyclic(&self) -> bool {
        self.cycles.is_empty()
    }

    /// Processes that sit on at least one cycle.
    pub fn processes_in_cycles(&self) -> usize {
        self.components.iter().map(Vec::len).sum()
    }
}

/// One pending visit: the node and the path that led to it.
struct Frame {
    node: ProcessId,
    path: Vec<ProcessId>,
}

/// Find every cycle the depth-first walk encounters.
///
/// Roots and neighbours are taken in ascending id order. Reaching a node
/// already on the current path emits the loop from that node's first
/// occurrence; reaching a node explored on another branch prunes silently.
pub fn find_cycles(graph: &DependencyGraph) -> Vec<Cycle> {
    let mut visited: HashSet<ProcessId> = HashSet::new();
    let mut found: BTreeSet<Cycle> = BTreeSet::new();

    for root in graph.process_ids() {
        let mut stack = vec![Frame {
            node: root,
            path: Vec::new(),
        }];

        while let Some(Frame { node, mut path }) = stack.pop() {
            if let Some(start) = path.iter().position(|id| *id == node) {
                let cycle = Cycle::canonical(path.split_off(start));
                debug!("Cycle found: {}", cycle);
                found.insert(cycle);
                continue;
            }
            if !visited.insert(node) {
                continue;
            }

            path.push(node);
            // Reverse push so the smallest neighbour is explored first.
            let deps: Vec<ProcessId> = graph.depends_on(node).collect();
            for dep in deps.into_iter().rev() {
                stack.push(Frame {
                    node: dep,
                    path: path.clone(),
                });
            }
        }
    }

    found.into_iter().collect()
}

/// Strongly connected components that contain a cycle.
///
/// Multi-node components always do; a single node counts only with a
/// self-edge.
pub fn cyclic_components(graph: &DependencyGraph) -> Vec<Vec<ProcessId>> {
    let (digraph, _) = graph.to_digraph();
    let mut components: Vec<Vec<ProcessId>> = kosaraju_scc(&digraph)
        .into_iter()
        .filter(|scc| {
            scc.len() > 1 || scc.iter().any(|idx| digraph.contains_edge(*idx, *idx))
        })
        .map(|scc| {
            let mut ids: Vec<ProcessId> = scc.into_iter().map(|idx| digraph[idx]).collect();
            ids.sort();
            ids
        })
        .collect();
    components.sort();
    components
}

/// Run both views over the graph.
pub fn detect_cycles(graph: &DependencyGraph) -> CycleReport {
    CycleReport {
        cycles: find_cycles(graph),
        components: cyclic_components(graph),
    }
}
