//! Integration tests for rdlt-cli functionality. Tests the underlying
//! library functions that the CLI commands invoke.

use rdlt_core::config::RdltConfig;
use std::io::Write;

#[test]
fn test_analyze_simple_acyclic_file() {
    let tmpdir = tempfile::tempdir().unwrap();
    let path = tmpdir.path().join("input.rdlt");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "x1, x2, a, 1\nx2, x3, b, 1").unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let report = rdlt_core::analyze(&text, &RdltConfig::default()).unwrap();
    assert!(report.l_safe);
    assert!(report.classically_sound);
}

#[test]
fn test_analyze_rejects_malformed_file() {
    let tmpdir = tempfile::tempdir().unwrap();
    let path = tmpdir.path().join("input.rdlt");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "x1, x2, a, notanumber").unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let result = rdlt_core::analyze(&text, &RdltConfig::default());
    assert!(result.is_err());
}

#[test]
fn test_config_loaded_from_project_root_next_to_input() {
    let tmpdir = tempfile::tempdir().unwrap();
    std::fs::create_dir(tmpdir.path().join(".rdlt")).unwrap();
    let mut f = std::fs::File::create(tmpdir.path().join(".rdlt").join("config.toml")).unwrap();
    writeln!(f, "[analysis]\nmax_depth = 25\n").unwrap();

    let config = RdltConfig::load(tmpdir.path()).unwrap();
    assert_eq!(config.analysis.max_depth, 25);
}

#[test]
fn test_analyze_json_report_serializes() {
    let report = rdlt_core::analyze("x1, x2, a, 1\nx2, x3, b, 1\n", &RdltConfig::default()).unwrap();
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"l_safe\":true"));
}
