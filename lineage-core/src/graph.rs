//! Process dependency graph.
//!
//! A plain adjacency map from each process to the processes it depends on,
//! with a conversion into a petgraph `DiGraph` for the algorithms that
//! petgraph already provides (strongly connected components, toposort).
//!
//! Edges point from a process to its dependency: `a -> b` means `a` reads
//! something `b` writes, so `b` must run first.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::types::{ProcessId, ProcessRow};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: BTreeMap<ProcessId, BTreeSet<ProcessId>>,
    names: BTreeMap<ProcessId, String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from dependency-table rows.
    ///
    /// Rows sharing an id are merged.
    pub fn from_rows(rows: &[ProcessRow]) -> Self {
        let mut graph = Self::new();
        for row in rows {
            graph.add_process(row.process_id, &row.process_name);
            for dep in &row.depends_on {
                graph.add_dependency(row.process_id, *dep);
            }
        }
        graph
    }

    /// Add a node without edges. Keeps the first non-empty name.
    pub fn add_process(&mut self, id: ProcessId, name: &str) {
        self.edges.entry(id).or_default();
        let entry = self.names.entry(id).or_default();
        if entry.is_empty() {
            *entry = name.to_string();
        }
    }

    /// Record that `process` depends on `dependency`.
    pub fn add_dependency(&mut self, process: ProcessId, dependency: ProcessId) {
        self.edges.entry(process).or_default().insert(dependency);
    }

    /// Process ids in ascending order.
    pub fn process_ids(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.edges.keys().copied()
    }

    /// Dependencies of a process in ascending order; empty when unknown.
    pub fn depends_on(&self, id: ProcessId) -> impl Iterator<Item = ProcessId> + '_ {
        self.edges.get(&id).into_iter().flatten().copied()
    }

    pub fn contains(&self, id: ProcessId) -> bool {
        self.edges.contains_key(&id)
    }

    pub fn name_of(&self, id: ProcessId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Number of processes.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Edges whose dependency has no row of its own.
    pub fn dangling_references(&self) -> Vec<(ProcessId, ProcessId)> {
        self.edges
            .iter()
            .flat_map(|(from, deps)| deps.iter().map(move |to| (*from, *to)))
            .filter(|(_, to)| !self.edges.contains_key(to))
            .collect()
    }

    /// Load into petgraph. Dangling dependencies become nodes too.
    pub(crate) fn to_digraph(&self) -> (DiGraph<ProcessId, ()>, HashMap<ProcessId, NodeIndex>) {
        let mut graph = DiGraph::with_capacity(self.len(), self.edge_count());
        let mut node_map = HashMap::with_capacity(self.len());

        let mut node = |graph: &mut DiGraph<ProcessId, ()>, id: ProcessId| {
            *node_map.entry(id).or_insert_with(|| graph.add_node(id))
        };

        for (from, deps) in &self.edges {
            let src = node(&mut graph, *from);
            for to in deps {
                let dst = node(&mut graph, *to);
                graph.add_edge(src, dst, ());
            }
        }

        (graph, node_map)
    }
}
