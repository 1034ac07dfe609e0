//! Process id space.
//!
//! The registry hands out `proc_NNNN` ids from a single counter: first to
//! every distinct program in first-seen order, then to one orphan process
//! per table that has no writer, in table key order. Ids are never reused.
//! Orphans created later by the resolver continue the same counter.

use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::classify::{distinct_programs, distinct_tables, WriterIndex};
use crate::normalize::orphan_name;
use crate::types::{Observation, Process, ProcessId, ProcessOrigin};

/// Name used for a real process whose path has no file name.
pub const UNKNOWN_PROGRAM: &str = "unknown_program";

/// Owner of every process created during one pipeline run.
#[derive(Debug, Clone)]
pub struct Registry {
    /// Indexed by `seq - 1`.
    processes: Vec<Process>,
    by_program: HashMap<String, ProcessId>,
    orphans: BTreeMap<String, ProcessId>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            processes: Vec::new(),
            by_program: HashMap::new(),
            orphans: BTreeMap::new(),
        }
    }

    /// Register every program, then synthesize orphans for writerless tables.
    pub fn build(observations: &[Observation], index: &WriterIndex) -> Self {
        let mut registry = Self::new();

        for (program, basename) in distinct_programs(observations) {
            registry.register_program(program, basename);
        }
        let programs = registry.len();

        for table in distinct_tables(observations) {
            if registry.writers_of(table, index).is_empty() {
                registry.ensure_orphan(table);
            }
        }

        debug!(
            "Registry: {} programs, {} orphans",
            programs,
            registry.orphans.len()
        );
        registry
    }

    fn next_id(&self) -> ProcessId {
        ProcessId::new(self.processes.len() as u32 + 1)
    }

    /// Id for a program, registering it on first sight.
    pub fn register_program(&mut self, program: &str, basename: &str) -> ProcessId {
        if let Some(id) = self.by_program.get(program) {
            return *id;
        }
        let id = self.next_id();
        let name = if basename.is_empty() {
            UNKNOWN_PROGRAM.to_string()
        } else {
            basename.to_string()
        };
        self.processes.push(Process {
            id,
            name,
            origin: ProcessOrigin::Real {
                program: program.to_string(),
            },
        });
        self.by_program.insert(program.to_string(), id);
        id
    }

    /// Orphan for a table, synthesizing it on first request.
    ///
    /// Returns the id and whether it was created by this call.
    pub fn ensure_orphan(&mut self, table: &str) -> (ProcessId, bool) {
        if let Some(id) = self.orphans.get(table) {
            return (*id, false);
        }
        let id = self.next_id();
        self.processes.push(Process {
            id,
            name: orphan_name(table),
            origin: ProcessOrigin::Orphan {
                table: table.to_string(),
            },
        });
        self.orphans.insert(table.to_string(), id);
        (id, true)
    }

    pub fn process_for(&self, program: &str) -> Option<ProcessId> {
        self.by_program.get(program).copied()
    }

    pub fn orphan_for(&self, table: &str) -> Option<ProcessId> {
        self.orphans.get(table).copied()
    }

    pub fn get(&self, id: ProcessId) -> Option<&Process> {
        let idx = (id.seq() as usize).checked_sub(1)?;
        self.processes.get(idx)
    }

    pub fn name_of(&self, id: ProcessId) -> Option<&str> {
        self.get(id).map(|p| p.name.as_str())
    }

    /// All processes in id order.
    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    /// Table -> orphan id, in table order.
    pub fn orphans(&self) -> impl Iterator<Item = (&str, ProcessId)> {
        self.orphans.iter().map(|(t, id)| (t.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    /// Registered process ids of a table's recorded writers, sorted.
    pub fn writers_of(&self, table: &str, index: &WriterIndex) -> Vec<ProcessId> {
        let mut ids: Vec<ProcessId> = index
            .writers(table)
            .map(|set| {
                set.programs
                    .iter()
                    .filter_map(|program| self.process_for(program))
                    .collect()
            })
            .unwrap_or_default();
        ids.sort();
        ids.dedup();
        ids
    }
}
