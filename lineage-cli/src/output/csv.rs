//! CSV output formatting for data export.
//!
//! Cells are escaped so that list-valued columns such as `depends_on`
//! (`proc_0001,proc_0002`) survive as a single quoted field.

use super::{Column, OutputConfig};
use serde::Serialize;

/// CSV output formatter
pub struct CsvOutput;

impl CsvOutput {
    /// Format an array of items as CSV with specified columns
    ///
    /// Always emits the header row, even for empty input.
    pub fn format_with_columns<T: Serialize>(
        data: &[T],
        columns: &[Column],
        _config: &OutputConfig,
    ) -> String {
        let mut output = String::new();

        let headers: Vec<String> = columns.iter().map(|c| Self::escape_value(&c.name)).collect();
        output.push_str(&headers.join(","));
        output.push('\n');

        for item in data {
            if let Ok(json) = serde_json::to_value(item) {
                let row: Vec<String> = columns
                    .iter()
                    .map(|col| {
                        json.get(&col.key)
                            .map(Self::value_to_csv)
                            .unwrap_or_default()
                    })
                    .collect();
                output.push_str(&row.join(","));
                output.push('\n');
            }
        }

        output.trim_end().to_string()
    }

    /// Format key/value pairs as a two-column CSV
    pub fn format_pairs(pairs: &[(&str, String)]) -> String {
        let mut output = String::from("key,value");
        for (key, value) in pairs {
            output.push('\n');
            output.push_str(&Self::escape_value(key));
            output.push(',');
            output.push_str(&Self::escape_value(value));
        }
        output
    }

    /// Convert a JSON value to a CSV cell
    fn value_to_csv(value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::Null => String::new(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => Self::escape_value(s),
            serde_json::Value::Array(arr) => Self::escape_value(
                &arr.iter()
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            serde_json::Value::Object(obj) => {
                Self::escape_value(&format!("{{{} fields}}", obj.len()))
            }
        }
    }

    /// Escape a string value for CSV
    ///
    /// Wraps in quotes if the value contains comma, newline, or quote.
    /// Doubles any existing quotes.
    pub fn escape_value(s: &str) -> String {
        if s.contains(',') || s.contains('\n') || s.contains('\r') || s.contains('"') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}
