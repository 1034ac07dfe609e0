//! Identifier normalization.
//!
//! Every comparison between program paths and object names goes through
//! these functions, so they must stay pure: the same raw text always maps
//! to the same key.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{Observation, ObservationRecord};

/// Separator between schema/database qualifiers and the table name.
pub const QUALIFIER_SEPARATOR: char = '.';

static SQL_EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.sql$").unwrap());

/// Canonicalize a raw identifier into a comparable key.
///
/// Trims, drops `[` and `]`, removes all whitespace and lowercases.
/// Blank input yields the empty key, which downstream stages treat as
/// "no identifier".
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| *c != '[' && *c != ']' && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Last qualifier segment of a normalized table key.
///
/// `edwstg.stg2c_cam` -> `stg2c_cam`; unqualified keys come back unchanged.
pub fn short_name(table: &str) -> &str {
    match table.rfind(QUALIFIER_SEPARATOR) {
        Some(idx) => &table[idx + QUALIFIER_SEPARATOR.len_utf8()..],
        None => table,
    }
}

/// Normalized file name of a program path, without a trailing `.sql`.
///
/// Both `/` and `\` separate path segments.
pub fn basename(program_path: &str) -> String {
    let trimmed = program_path.trim();
    let file = trimmed
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(trimmed);
    normalize(&SQL_EXTENSION.replace(file, ""))
}

/// Name given to the placeholder process that stands in for a table's writer.
pub fn orphan_name(table: &str) -> String {
    format!("orphaned_{}", table.replace(QUALIFIER_SEPARATOR, "_"))
}

/// Normalize every field of a raw observation.
pub fn observation(record: &ObservationRecord) -> Observation {
    Observation {
        program: normalize(&record.program),
        basename: basename(&record.program),
        object: normalize(&record.object),
        operation: record
            .operation
            .as_deref()
            .map(|op| op.trim().to_lowercase())
            .unwrap_or_default(),
    }
}
