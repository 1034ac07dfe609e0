//! Writer inference.
//!
//! Decides which programs write each table. Two signals are combined with a
//! fixed precedence:
//!
//! 1. **Operation keywords** are authoritative: a row whose operation text
//!    contains a writer keyword (`insert`, `truncate`, ...) records its
//!    program as a writer of its object.
//! 2. **File names** are a fallback: for tables the keyword pass left
//!    without writers, any program whose basename mentions the table's
//!    short name becomes a candidate writer.
//!
//! Keyword evidence, once present, is never widened by the file-name pass.
//! Both passes may record several writers for one table; that ambiguity is
//! kept and later surfaces as multiple dependency edges.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info, warn};

use crate::error::{LineageError, Result};
use crate::normalize::short_name;
use crate::types::{Observation, WriterSource};

const DEFAULT_WRITER_KEYWORDS: &[&str] = &[
    "create",
    "insert",
    "truncate",
    "write",
    "update",
    "drop",
    "select into",
];

const DEFAULT_READ_KEYWORDS: &[&str] = &["read", "select"];

const DEFAULT_TOKEN_PATTERN: &str = r"[^0-9a-zA-Z_]+";

/// Tunable data behind the classifier.
///
/// Deserializable so the keyword lists and matching rule can live in a
/// config file instead of code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierRules {
    /// Operation substrings that mark a row as a write.
    pub writer_keywords: Vec<String>,

    /// Operation substrings that mark a row as a read.
    ///
    /// A row without operation text is always a read.
    pub read_keywords: Vec<String>,

    /// Regex splitting a program basename into tokens.
    pub token_pattern: String,

    /// Whether a raw substring hit in the basename counts as a match.
    ///
    /// When `false`, the table's short name must equal a whole token.
    pub substring_match: bool,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            writer_keywords: DEFAULT_WRITER_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            read_keywords: DEFAULT_READ_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            token_pattern: DEFAULT_TOKEN_PATTERN.to_string(),
            substring_match: true,
        }
    }
}

/// Writers recorded for one table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableWriterSet {
    /// Normalized program keys.
    pub programs: BTreeSet<String>,
    pub source: WriterSource,
}

/// Table -> writer programs, built once and read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct WriterIndex {
    entries: BTreeMap<String, TableWriterSet>,
}

impl WriterIndex {
    /// Writer program keys for a table, if any were found.
    pub fn writers(&self, table: &str) -> Option<&TableWriterSet> {
        self.entries.get(table)
    }

    /// Whether any writer is known for the table.
    pub fn has_writer(&self, table: &str) -> bool {
        self.entries
            .get(table)
            .is_some_and(|set| !set.programs.is_empty())
    }

    /// Tables with at least one writer, in key order.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, table: &str, program: &str, source: WriterSource) {
        self.entries
            .entry(table.to_string())
            .or_insert_with(|| TableWriterSet {
                programs: BTreeSet::new(),
                source,
            })
            .programs
            .insert(program.to_string());
    }
}

/// Compiled form of [`ClassifierRules`].
#[derive(Clone, Debug)]
pub struct WriterClassifier {
    rules: ClassifierRules,
    writer_keywords: Vec<String>,
    read_keywords: Vec<String>,
    tokenizer: Regex,
}

impl WriterClassifier {
    /// Compile the rules. Fails only on an invalid token pattern.
    pub fn new(rules: ClassifierRules) -> Result<Self> {
        let tokenizer =
            Regex::new(&rules.token_pattern).map_err(|e| LineageError::InvalidPattern {
                pattern: rules.token_pattern.clone(),
                message: e.to_string(),
            })?;
        let lower = |words: &[String]| -> Vec<String> {
            words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect()
        };

        Ok(Self {
            writer_keywords: lower(&rules.writer_keywords),
            read_keywords: lower(&rules.read_keywords),
            tokenizer,
            rules,
        })
    }

    /// Whether a normalized operation marks a write.
    pub fn is_writer(&self, operation: &str) -> bool {
        !operation.is_empty() && self.writer_keywords.iter().any(|k| operation.contains(k.as_str()))
    }

    /// Whether a normalized operation marks a read.
    ///
    /// Missing operation text defaults to a read. Text such as
    /// `select into` can satisfy both this and [`Self::is_writer`]; both
    /// classifications then apply.
    pub fn is_read(&self, operation: &str) -> bool {
        operation.is_empty() || self.read_keywords.iter().any(|k| operation.contains(k.as_str()))
    }

    /// Whether a program basename names the given table short name.
    pub fn basename_matches(&self, basename: &str, short: &str) -> bool {
        if basename.is_empty() || short.is_empty() {
            return false;
        }
        if self.rules.substring_match && basename.contains(short) {
            return true;
        }
        self.tokenizer
            .split(basename)
            .any(|token| !token.is_empty() && token == short)
    }

    /// Build the writer index for a batch of normalized observations.
    pub fn classify(&self, observations: &[Observation]) -> WriterIndex {
        let mut index = WriterIndex::default();

        // Keyword pass
        for obs in observations {
            if obs.program.is_empty() || obs.object.is_empty() {
                continue;
            }
            if self.is_writer(&obs.operation) {
                index.insert(&obs.object, &obs.program, WriterSource::Keyword);
            }
        }
        let keyword_tables = index.len();
        debug!("Keyword pass found writers for {} tables", keyword_tables);

        // File-name pass, judged against the keyword snapshot only
        let keyword_snapshot: HashSet<String> = index.tables().map(str::to_string).collect();
        let mut tables = distinct_tables(observations);
        tables.retain(|t| !keyword_snapshot.contains(*t));

        for (program, basename) in distinct_programs(observations) {
            for table in &tables {
                if self.basename_matches(basename, short_name(table)) {
                    debug!("{} matched by file name of {}", table, program);
                    index.insert(table, program, WriterSource::Filename);
                }
            }
        }

        let ambiguous = index
            .entries
            .values()
            .filter(|set| set.programs.len() > 1)
            .count();
        if ambiguous > 0 {
            warn!("{} tables have more than one candidate writer", ambiguous);
        }
        info!(
            "Writer inference: {} tables by keyword, {} by file name",
            keyword_tables,
            index.len() - keyword_tables
        );

        index
    }
}

/// Distinct non-empty table keys, sorted.
pub(crate) fn distinct_tables(observations: &[Observation]) -> BTreeSet<&str> {
    observations
        .iter()
        .map(|obs| obs.object.as_str())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Distinct non-empty programs with their basenames, in first-seen order.
pub(crate) fn distinct_programs(observations: &[Observation]) -> Vec<(&str, &str)> {
    let mut seen = HashSet::new();
    observations
        .iter()
        .filter(|obs| !obs.program.is_empty())
        .filter(|obs| seen.insert(obs.program.as_str()))
        .map(|obs| (obs.program.as_str(), obs.basename.as_str()))
        .collect()
}
