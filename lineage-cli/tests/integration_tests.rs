//! Integration tests for the lineage CLI
//!
//! Tests end-to-end command behavior using the CLI binary.
//! Uses tempfile for isolated test directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Get the path to the lineage binary (built by cargo)
fn lineage_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_lineage"))
}

/// Run lineage with the given args in the specified directory
fn run_lineage(dir: &Path, args: &[&str]) -> Output {
    lineage_binary()
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute lineage command")
}

/// Get stdout as string
fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Get stderr as string
fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("Failed to write input file");
    path
}

/// A small export: staging feeds a mart, a report reads the mart plus an
/// external feed nobody writes.
const SAMPLE_XREF: &str = "\
Program,Object,Operation
etl/stage_orders.sql,[stg].[orders],INSERT
etl/stage_orders.sql,src.orders_feed,SELECT
etl/build_mart.sql,mart.orders,INSERT
etl/build_mart.sql,stg.orders,SELECT
reports/daily.sql,mart.orders,SELECT
reports/daily.sql,ref.calendar,
";

/// Two programs that each read what the other writes.
const CYCLIC_XREF: &str = "\
Program,Object,Operation
a.sql,t1,insert
a.sql,t2,select
b.sql,t2,insert
b.sql,t1,select
";

fn json_stdout(output: &Output) -> serde_json::Value {
    let text = stdout(output);
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("Output should be valid JSON ({}): {}", e, text))
}

fn csv_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read out dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|n| n.ends_with(".csv"))
        .collect();
    names.sort();
    names
}

// ============================================================================
// graph / writers
// ============================================================================

#[test]
fn test_graph_json() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "xref.csv", SAMPLE_XREF);

    let output = run_lineage(temp_dir.path(), &["graph", "xref.csv", "--format", "json"]);
    assert!(output.status.success(), "graph should succeed: {}", stderr(&output));

    let json = json_stdout(&output);
    let rows = json.as_array().expect("array of rows");
    // 3 programs + orphans for ref.calendar and src.orders_feed
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0]["process_id"], "proc_0001");
    assert_eq!(rows[0]["process_name"], "stage_orders");
    assert_eq!(rows[0]["depends_on"], "proc_0005");
    assert_eq!(rows[1]["depends_on"], "proc_0001");
    assert_eq!(rows[2]["depends_on"], "proc_0002,proc_0004");
    assert_eq!(rows[3]["process_name"], "orphaned_ref_calendar");
    assert_eq!(rows[4]["process_name"], "orphaned_src_orders_feed");
}

#[test]
fn test_graph_table_format() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "xref.csv", SAMPLE_XREF);

    let output = run_lineage(temp_dir.path(), &["graph", "xref.csv"]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert!(text.contains("Process ID"));
    assert!(text.contains("proc_0003"));
    assert!(text.contains("build_mart"));
}

#[test]
fn test_writers_csv() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "xref.csv", SAMPLE_XREF);

    let output = run_lineage(temp_dir.path(), &["writers", "xref.csv", "--format", "csv"]);
    assert!(output.status.success());

    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines[0],
        "table,table_short,writer_process_ids,writer_process_names,source"
    );
    assert!(lines.contains(&"stg.orders,orders,proc_0001,stage_orders,keyword"));
    assert!(lines.contains(&"ref.calendar,calendar,proc_0004,orphaned_ref_calendar,orphan"));
}

#[test]
fn test_tsv_and_json_inputs() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(
        temp_dir.path(),
        "xref.tsv",
        "program\tobject\toperation\nload.sql\tdim\tinsert\nuse.sql\tdim\tselect\n",
    );
    write_file(
        temp_dir.path(),
        "xref.json",
        r#"[{"Program":"load.sql","Object":"dim","Operation":"insert"},{"Program":"use.sql","Object":"dim","Operation":"select"}]"#,
    );

    let tsv = run_lineage(temp_dir.path(), &["graph", "xref.tsv", "--format", "json"]);
    let json = run_lineage(temp_dir.path(), &["graph", "xref.json", "--format", "json"]);
    assert!(tsv.status.success() && json.status.success());
    assert_eq!(json_stdout(&tsv), json_stdout(&json));
}

// ============================================================================
// build
// ============================================================================

#[test]
fn test_build_writes_both_tables() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "xref.csv", SAMPLE_XREF);

    let output = run_lineage(
        temp_dir.path(),
        &["build", "xref.csv", "-o", "out", "--no-timestamp", "--format", "json"],
    );
    assert!(output.status.success(), "build should succeed: {}", stderr(&output));

    let out_dir = temp_dir.path().join("out");
    assert_eq!(
        csv_files(&out_dir),
        vec!["control_table_dependencies.csv", "table_writer_map.csv"]
    );

    let control = fs::read_to_string(out_dir.join("control_table_dependencies.csv")).unwrap();
    let lines: Vec<&str> = control.lines().collect();
    assert_eq!(lines[0], "process_id,process_name,depends_on");
    assert_eq!(lines[3], "proc_0003,daily,\"proc_0002,proc_0004\"");
    assert_eq!(lines.len(), 6);

    let json = json_stdout(&output);
    assert_eq!(json["summary"]["processes"], 5);
    assert_eq!(json["summary"]["orphans"], 2);
    assert!(json.get("cycles").is_none());
}

#[test]
fn test_build_timestamped_names() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "xref.csv", SAMPLE_XREF);

    let output = run_lineage(temp_dir.path(), &["build", "xref.csv", "-o", "out"]);
    assert!(output.status.success());

    let files = csv_files(&temp_dir.path().join("out"));
    assert_eq!(files.len(), 2);
    // control_table_dependencies_YYYYMMDD_HHMMSS.csv
    assert!(files[0].starts_with("control_table_dependencies_"));
    assert_eq!(files[0].len(), "control_table_dependencies_".len() + 15 + ".csv".len());
    assert!(files[1].starts_with("table_writer_map_"));
}

#[test]
fn test_build_missing_columns_writes_nothing() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "bad.csv", "Script,Operation\na.sql,insert\n");

    let output = run_lineage(temp_dir.path(), &["build", "bad.csv", "-o", "out"]);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("program, object"));
    assert!(!temp_dir.path().join("out").exists());
}

#[test]
fn test_unsupported_input_format() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "xref.xlsx", "not really a workbook");

    let output = run_lineage(temp_dir.path(), &["graph", "xref.xlsx"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Unsupported input format"));
}

#[test]
fn test_build_check_cycles_reports_cycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "xref.csv", CYCLIC_XREF);

    let output = run_lineage(
        temp_dir.path(),
        &["build", "xref.csv", "-o", "out", "--no-timestamp", "--check-cycles", "--format", "json"],
    );
    assert!(output.status.success());

    let json = json_stdout(&output);
    assert_eq!(json["cycles"]["acyclic"], false);
    assert_eq!(json["cycles"]["cycles"][0], "proc_0001 -> proc_0002 -> proc_0001");
}

// ============================================================================
// cycles / order
// ============================================================================

#[test]
fn test_cycles_acyclic() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "xref.csv", SAMPLE_XREF);

    let output = run_lineage(temp_dir.path(), &["cycles", "xref.csv", "--fail-on-cycle"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No cycles found"));
}

#[test]
fn test_cycles_exit_status() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "xref.csv", CYCLIC_XREF);

    let report_only = run_lineage(temp_dir.path(), &["cycles", "xref.csv"]);
    assert!(report_only.status.success());
    assert!(stdout(&report_only).contains("1. proc_0001 -> proc_0002 -> proc_0001"));

    let failing = run_lineage(temp_dir.path(), &["cycles", "xref.csv", "--fail-on-cycle"]);
    assert_eq!(failing.status.code(), Some(2));
}

#[test]
fn test_cycles_on_control_table() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(
        temp_dir.path(),
        "control.csv",
        "process_id,process_name,depends_on\n\
         proc_0001,a,proc_0003\n\
         proc_0002,b,proc_0001\n\
         proc_0003,c,\"proc_0002, proc_0004\"\n\
         proc_0004,d,\n",
    );

    let output = run_lineage(
        temp_dir.path(),
        &["cycles", "control.csv", "--control-table", "--format", "json"],
    );
    assert!(output.status.success(), "{}", stderr(&output));

    let json = json_stdout(&output);
    assert_eq!(json["total_cycles"], 1);
    assert_eq!(
        json["cycles"][0],
        "proc_0001 -> proc_0003 -> proc_0002 -> proc_0001"
    );
    assert_eq!(json["processes_in_cycles"], 3);
}

#[test]
fn test_build_output_feeds_cycle_check() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "xref.csv", CYCLIC_XREF);

    let build = run_lineage(temp_dir.path(), &["build", "xref.csv", "--no-timestamp"]);
    assert!(build.status.success());

    let check = run_lineage(
        temp_dir.path(),
        &[
            "cycles",
            "control_table_dependencies.csv",
            "--control-table",
            "--fail-on-cycle",
        ],
    );
    assert_eq!(check.status.code(), Some(2));
}

#[test]
fn test_order_stages() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "xref.csv", SAMPLE_XREF);

    let output = run_lineage(temp_dir.path(), &["order", "xref.csv", "--format", "json"]);
    assert!(output.status.success());

    let json = json_stdout(&output);
    let rows = json.as_array().unwrap();
    let stage_of = |id: &str| {
        rows.iter()
            .find(|r| r["process_id"] == id)
            .map(|r| r["stage"].as_u64().unwrap())
            .unwrap()
    };
    assert_eq!(stage_of("proc_0004"), 0);
    assert_eq!(stage_of("proc_0005"), 0);
    assert_eq!(stage_of("proc_0001"), 1);
    assert_eq!(stage_of("proc_0002"), 2);
    assert_eq!(stage_of("proc_0003"), 3);
}

#[test]
fn test_order_fails_on_cycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "xref.csv", CYCLIC_XREF);

    let output = run_lineage(temp_dir.path(), &["order", "xref.csv"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("cyclic"));
}

// ============================================================================
// configuration
// ============================================================================

#[test]
fn test_config_sets_default_format_and_keywords() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(
        temp_dir.path(),
        ".lineagerc.toml",
        "[classifier]\nwriter_keywords = [\"merge\"]\n\n[output]\nformat = \"json\"\n",
    );
    write_file(
        temp_dir.path(),
        "xref.csv",
        "Program,Object,Operation\nm.sql,t,MERGE\nr.sql,t,select\n",
    );

    let output = run_lineage(temp_dir.path(), &["graph", "xref.csv"]);
    assert!(output.status.success());

    let json = json_stdout(&output);
    assert_eq!(json[1]["depends_on"], "proc_0001");
}

#[test]
fn test_format_flag_overrides_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), ".lineagerc.toml", "[output]\nformat = \"json\"\n");
    write_file(temp_dir.path(), "xref.csv", SAMPLE_XREF);

    let output = run_lineage(temp_dir.path(), &["graph", "xref.csv", "--format", "csv"]);
    assert!(output.status.success());
    assert!(stdout(&output).starts_with("process_id,process_name,depends_on"));
}

#[test]
fn test_invalid_token_pattern_is_fatal() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "rules.toml", "[classifier]\ntoken_pattern = \"[oops\"\n");
    write_file(temp_dir.path(), "xref.csv", SAMPLE_XREF);

    let output = run_lineage(
        temp_dir.path(),
        &["graph", "xref.csv", "--config", "rules.toml"],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Invalid token pattern"));
}

#[test]
fn test_missing_config_file_is_an_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_file(temp_dir.path(), "xref.csv", SAMPLE_XREF);

    let output = run_lineage(
        temp_dir.path(),
        &["graph", "xref.csv", "--config", "missing.toml"],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Config file not found"));
}

#[test]
fn test_no_command_prints_help() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = run_lineage(temp_dir.path(), &[]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage"));
}
