//! Data models shared by every pipeline stage.
//!
//! These types describe raw lineage observations, the processes derived
//! from them, and the two tabular artifacts the pipeline emits: the
//! dependency table (one row per process) and the table/writer audit.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::LineageError;

/// Prefix of every rendered process id.
const PROCESS_ID_PREFIX: &str = "proc_";

/// Stable synthetic identifier of a process.
///
/// Wraps the sequence number handed out by the registry. Rendered as
/// `proc_0001`; ordering is numeric so ids past `proc_9999` still sort
/// after their predecessors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessId(u32);

impl ProcessId {
    pub fn new(seq: u32) -> Self {
        Self(seq)
    }

    /// The sequence number behind the id.
    pub fn seq(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:04}", PROCESS_ID_PREFIX, self.0)
    }
}

impl FromStr for ProcessId {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .strip_prefix(PROCESS_ID_PREFIX)
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u32>().ok())
            .map(ProcessId)
            .ok_or_else(|| LineageError::InvalidProcessId(trimmed.to_string()))
    }
}

impl Serialize for ProcessId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProcessId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// One raw lineage fact: a program touched an object with some operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub program: String,
    pub object: String,
    /// Absent when the source table has no operation column.
    pub operation: Option<String>,
}

impl ObservationRecord {
    pub fn new(
        program: impl Into<String>,
        object: impl Into<String>,
        operation: Option<&str>,
    ) -> Self {
        Self {
            program: program.into(),
            object: object.into(),
            operation: operation.map(str::to_string),
        }
    }
}

/// Normalized view of an [`ObservationRecord`].
///
/// Empty strings mean "no identifier" and are filtered out by every stage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Observation {
    /// Normalized full program path (the process key).
    pub program: String,
    /// Normalized file name without `.sql`.
    pub basename: String,
    /// Normalized table key.
    pub object: String,
    /// Trimmed, lowercased operation text; empty when absent.
    pub operation: String,
}

/// Where a process came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProcessOrigin {
    /// An observed program, keyed by its normalized path.
    Real { program: String },
    /// Placeholder writer synthesized for a table nobody was seen writing.
    Orphan { table: String },
}

/// A schedulable unit of work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub id: ProcessId,
    pub name: String,
    pub origin: ProcessOrigin,
}

impl Process {
    pub fn is_orphan(&self) -> bool {
        matches!(self.origin, ProcessOrigin::Orphan { .. })
    }
}

/// How a table's writers were established.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriterSource {
    /// An operation keyword named the writer.
    Keyword,
    /// The program file name mentions the table.
    Filename,
    /// No writer was found; a placeholder stands in.
    Orphan,
}

impl fmt::Display for WriterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WriterSource::Keyword => "keyword",
            WriterSource::Filename => "filename",
            WriterSource::Orphan => "orphan",
        };
        f.write_str(label)
    }
}

/// One row of the dependency table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRow {
    pub process_id: ProcessId,
    pub process_name: String,
    /// Sorted, duplicate-free; never contains `process_id`.
    #[serde(with = "comma_list")]
    pub depends_on: Vec<ProcessId>,
}

/// One row of the table/writer audit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableWriters {
    pub table: String,
    pub table_short: String,
    #[serde(with = "comma_list")]
    pub writer_process_ids: Vec<ProcessId>,
    #[serde(with = "comma_list")]
    pub writer_process_names: Vec<String>,
    pub source: WriterSource,
}

/// Join a list into the comma-separated cell format used by both outputs.
pub fn join_list<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Split a comma-separated cell, dropping blank entries.
pub fn split_list(cell: &str) -> impl Iterator<Item = &str> {
    cell.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Serde adapter rendering `Vec<T>` as a single comma-separated string.
mod comma_list {
    use super::{join_list, split_list};
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::fmt::Display;
    use std::str::FromStr;

    pub fn serialize<S, T>(items: &[T], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Display,
    {
        serializer.serialize_str(&join_list(items))
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
        T::Err: Display,
    {
        let raw = String::deserialize(deserializer)?;
        split_list(&raw)
            .map(|s| s.parse().map_err(de::Error::custom))
            .collect()
    }
}
