//! Tabular input readers.
//!
//! Observation tables arrive as CSV, TSV or a JSON array of objects. The
//! program/object/operation columns are located by header name rather than
//! position, so exports with extra or reordered columns still load.
//!
//! Previously written dependency tables can be read back for cycle checks
//! with [`read_control_table`].

use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{LineageError, Result};
use crate::types::{split_list, ObservationRecord, ProcessId, ProcessRow};

/// File formats the readers understand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    Csv,
    Tsv,
    Json,
}

impl InputFormat {
    /// Pick a format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(InputFormat::Csv),
            Some("tsv") => Ok(InputFormat::Tsv),
            Some("json") => Ok(InputFormat::Json),
            _ => Err(LineageError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }

    fn delimiter(self) -> u8 {
        match self {
            InputFormat::Tsv => b'\t',
            _ => b',',
        }
    }
}

/// Positions of the observation columns within a header row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnMap {
    pub program: usize,
    pub object: usize,
    pub operation: Option<usize>,
}

/// Locate the observation columns.
///
/// A header is assigned to the first role whose name it contains, checked
/// in the order program, object, operation. Later headers overwrite earlier
/// ones for the same role.
pub fn resolve_columns<S: AsRef<str>>(headers: &[S]) -> Result<ColumnMap> {
    let mut program = None;
    let mut object = None;
    let mut operation = None;

    for (idx, header) in headers.iter().enumerate() {
        let lc = header.as_ref().trim().to_lowercase();
        if lc.contains("program") {
            program = Some(idx);
        } else if lc.contains("object") {
            object = Some(idx);
        } else if lc.contains("operation") {
            operation = Some(idx);
        }
    }

    match (program, object) {
        (Some(program), Some(object)) => Ok(ColumnMap {
            program,
            object,
            operation,
        }),
        _ => {
            let missing: Vec<&str> = [("program", program), ("object", object)]
                .into_iter()
                .filter(|(_, idx)| idx.is_none())
                .map(|(role, _)| role)
                .collect();
            Err(LineageError::MissingColumns {
                missing: missing.join(", "),
                found: headers.iter().map(|h| h.as_ref().trim().to_string()).collect(),
            })
        }
    }
}

/// Read an observation table, choosing the parser by file extension.
pub fn read_observations(path: &Path) -> Result<Vec<ObservationRecord>> {
    let format = InputFormat::from_path(path)?;
    let reader = BufReader::new(File::open(path)?);
    let records = match format {
        InputFormat::Json => read_json_observations(reader)?,
        _ => read_delimited_observations(reader, format.delimiter())?,
    };
    debug!("Read {} observations from {}", records.len(), path.display());
    Ok(records)
}

/// Read observations from delimited text with a header row.
///
/// Short rows are tolerated; missing cells read as empty.
pub fn read_delimited_observations<R: Read>(reader: R, delimiter: u8) -> Result<Vec<ObservationRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let columns = resolve_columns(&headers)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let cell = |idx: usize| row.get(idx).unwrap_or("");
        records.push(ObservationRecord::new(
            cell(columns.program),
            cell(columns.object),
            columns.operation.map(cell),
        ));
    }
    Ok(records)
}

/// Read observations from a JSON array of objects.
///
/// Headers are the union of keys over all rows. Scalars are stringified
/// and `null` or an absent key reads as empty.
pub fn read_json_observations<R: Read>(reader: R) -> Result<Vec<ObservationRecord>> {
    let (rows, headers) = read_json_rows(reader)?;
    let columns = resolve_columns(&headers)?;

    let records = rows
        .iter()
        .map(|row| {
            let cell = |idx: usize| row.get(&headers[idx]).map(json_cell).unwrap_or_default();
            ObservationRecord {
                program: cell(columns.program),
                object: cell(columns.object),
                operation: columns.operation.map(cell),
            }
        })
        .collect();
    Ok(records)
}

/// Parse a JSON array of objects, returning the rows and the union of
/// their keys in first-seen order.
fn read_json_rows<R: Read>(reader: R) -> Result<(Vec<Value>, Vec<String>)> {
    let rows: Vec<Value> = serde_json::from_reader(reader)?;

    let mut headers: Vec<String> = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        let Value::Object(map) = row else {
            return Err(LineageError::MalformedJson { row: idx });
        };
        for key in map.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }
    Ok((rows, headers))
}

fn json_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read a dependency table previously written by the pipeline.
///
/// The same header rules apply to every format: `process_id` and
/// `depends_on` are required (case-insensitive), `process_name` is
/// optional, and rows with a blank id are skipped.
pub fn read_control_table(path: &Path) -> Result<Vec<ProcessRow>> {
    let format = InputFormat::from_path(path)?;
    let reader = BufReader::new(File::open(path)?);
    let rows = match format {
        InputFormat::Json => read_json_control_table(reader)?,
        _ => read_delimited_control_table(reader, format.delimiter())?,
    };
    debug!("Read {} control rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Column positions of a dependency table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ControlColumns {
    id: usize,
    depends_on: usize,
    name: Option<usize>,
}

fn resolve_control_columns(headers: &[String]) -> Result<ControlColumns> {
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };

    match (find("process_id"), find("depends_on")) {
        (Some(id), Some(depends_on)) => Ok(ControlColumns {
            id,
            depends_on,
            name: find("process_name"),
        }),
        (id, deps) => {
            let missing: Vec<&str> = [("process_id", id), ("depends_on", deps)]
                .into_iter()
                .filter(|(_, idx)| idx.is_none())
                .map(|(name, _)| name)
                .collect();
            Err(LineageError::MissingColumns {
                missing: missing.join(", "),
                found: headers.to_vec(),
            })
        }
    }
}

/// Build one row from its id, name and dependency cells.
///
/// `line` is the one-based data row, used for the skip warning.
fn control_row(line: usize, id: &str, name: &str, depends_on: &str) -> Result<Option<ProcessRow>> {
    let id = id.trim();
    if id.is_empty() {
        warn!("Control table row {} has no process_id; skipping", line);
        return Ok(None);
    }
    let depends_on = split_list(depends_on)
        .map(str::parse::<ProcessId>)
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(ProcessRow {
        process_id: id.parse()?,
        process_name: name.trim().to_string(),
        depends_on,
    }))
}

/// Read dependency rows from delimited text.
pub fn read_delimited_control_table<R: Read>(reader: R, delimiter: u8) -> Result<Vec<ProcessRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let columns = resolve_control_columns(&headers)?;

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let cell = |col: usize| record.get(col).unwrap_or("");
        let row = control_row(
            idx + 1,
            cell(columns.id),
            columns.name.map(cell).unwrap_or(""),
            cell(columns.depends_on),
        )?;
        rows.extend(row);
    }
    Ok(rows)
}

/// Read dependency rows from a JSON array of objects.
///
/// `null` or absent cells read as empty.
pub fn read_json_control_table<R: Read>(reader: R) -> Result<Vec<ProcessRow>> {
    let (records, headers) = read_json_rows(reader)?;
    let columns = resolve_control_columns(&headers)?;

    let mut rows = Vec::new();
    for (idx, record) in records.iter().enumerate() {
        let cell = |col: usize| record.get(&headers[col]).map(json_cell).unwrap_or_default();
        let row = control_row(
            idx + 1,
            &cell(columns.id),
            &columns.name.map(cell).unwrap_or_default(),
            &cell(columns.depends_on),
        )?;
        rows.extend(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_columns_by_substring() {
        let cols = resolve_columns(&["Source Program", "Object Name", "Operation Type"]).unwrap();
        assert_eq!(
            cols,
            ColumnMap {
                program: 0,
                object: 1,
                operation: Some(2)
            }
        );
    }

    #[test]
    fn test_resolve_columns_last_match_wins() {
        let cols = resolve_columns(&["Program", "Object", "Program Path"]).unwrap();
        assert_eq!(cols.program, 2);
        assert_eq!(cols.operation, None);
    }

    #[test]
    fn test_resolve_columns_role_precedence() {
        // "program object" matches program first and never becomes object.
        let err = resolve_columns(&["program object", "operation"]).unwrap_err();
        match err {
            LineageError::MissingColumns { missing, found } => {
                assert_eq!(missing, "object");
                assert_eq!(found.len(), 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_both_columns() {
        let err = resolve_columns(&["Operation"]).unwrap_err();
        assert!(err.to_string().contains("program, object"));
    }

    #[test]
    fn test_read_csv_with_short_rows() {
        let data = "Program,Object,Operation\netl/a.sql,dbo.t,INSERT\netl/b.sql,dbo.t\n";
        let records = read_delimited_observations(data.as_bytes(), b',').unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], ObservationRecord::new("etl/a.sql", "dbo.t", Some("INSERT")));
        assert_eq!(records[1].operation.as_deref(), Some(""));
    }

    #[test]
    fn test_read_csv_without_operation_column() {
        let data = "PROGRAM,OBJECT\na.sql,t\n";
        let records = read_delimited_observations(data.as_bytes(), b',').unwrap();
        assert_eq!(records[0].operation, None);
    }

    #[test]
    fn test_read_tsv() {
        let data = "program\tobject\toperation\na.sql\tdbo.x, y\tselect\n";
        let records = read_delimited_observations(data.as_bytes(), b'\t').unwrap();
        assert_eq!(records[0].object, "dbo.x, y");
    }

    #[test]
    fn test_read_json() {
        let data = r#"[
            {"Program": "a.sql", "Object": "t", "Operation": "insert"},
            {"Program": "b.sql", "Object": "t", "Operation": null},
            {"Program": 42, "Object": true}
        ]"#;
        let records = read_json_observations(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].operation.as_deref(), Some(""));
        assert_eq!(records[2].program, "42");
        assert_eq!(records[2].object, "true");
    }

    #[test]
    fn test_read_json_rejects_non_objects() {
        let err = read_json_observations(r#"[{"program":"a","object":"b"}, 3]"#.as_bytes()).unwrap_err();
        assert!(matches!(err, LineageError::MalformedJson { row: 1 }));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = read_observations(Path::new("lineage.xlsx")).unwrap_err();
        assert!(matches!(err, LineageError::UnsupportedFormat { .. }));
    }

    #[test]
    fn test_read_observations_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lineage.CSV");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "Program,Object,Operation").unwrap();
        writeln!(file, "load.sql,dim,insert").unwrap();
        drop(file);

        let records = read_observations(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].program, "load.sql");
    }

    #[test]
    fn test_read_control_table() {
        let data = "Process_ID,Process_Name,Depends_On\n\
                    proc_0001,load,\n\
                    proc_0002,report,\"proc_0001, proc_0003\"\n\
                    ,blank,\n";
        let rows = read_delimited_control_table(data.as_bytes(), b',').unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].depends_on.is_empty());
        assert_eq!(rows[1].process_name, "report");
        assert_eq!(
            rows[1].depends_on,
            vec![ProcessId::new(1), ProcessId::new(3)]
        );
    }

    #[test]
    fn test_control_table_requires_columns() {
        let err = read_delimited_control_table("process_id,deps\n".as_bytes(), b',').unwrap_err();
        match err {
            LineageError::MissingColumns { missing, .. } => assert_eq!(missing, "depends_on"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_control_table_bad_id() {
        let data = "process_id,depends_on\nproc_0001,job_7\n";
        let err = read_delimited_control_table(data.as_bytes(), b',').unwrap_err();
        assert!(matches!(err, LineageError::InvalidProcessId(ref s) if s == "job_7"));
    }

    #[test]
    fn test_control_table_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deps.json");
        std::fs::write(
            &path,
            r#"[{"process_id":"proc_0002","process_name":"r","depends_on":"proc_0001"}]"#,
        )
        .unwrap();
        let rows = read_control_table(&path).unwrap();
        assert_eq!(rows[0].depends_on, vec![ProcessId::new(1)]);
    }

    #[test]
    fn test_json_control_table_without_names() {
        let data = r#"[{"process_id":"proc_0001","depends_on":""},{"process_id":"proc_0002","depends_on":"proc_0001"}]"#;
        let rows = read_json_control_table(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].process_name, "");
        assert_eq!(rows[1].depends_on, vec![ProcessId::new(1)]);
    }

    #[test]
    fn test_json_control_table_mixed_case_keys() {
        let data = r#"[
            {"Process_ID":"proc_0003","Process_Name":"merge","Depends_On":null},
            {"Process_ID":"","Process_Name":"blank","Depends_On":""},
            {"Process_ID":"proc_0004","Process_Name":"load","Depends_On":"proc_0003, proc_0001"}
        ]"#;
        let rows = read_json_control_table(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].process_id, ProcessId::new(3));
        assert_eq!(rows[0].process_name, "merge");
        assert!(rows[0].depends_on.is_empty());
        assert_eq!(
            rows[1].depends_on,
            vec![ProcessId::new(3), ProcessId::new(1)]
        );
    }

    #[test]
    fn test_json_control_table_requires_columns() {
        let err = read_json_control_table(r#"[{"process_id":"proc_0001"}]"#.as_bytes()).unwrap_err();
        match err {
            LineageError::MissingColumns { missing, found } => {
                assert_eq!(missing, "depends_on");
                assert_eq!(found, vec!["process_id"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
