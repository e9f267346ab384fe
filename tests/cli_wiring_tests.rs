//! CLI wiring integration tests
//!
//! Tests end-to-end CLI behavior:
//! - `--once` collection against a local store
//! - Exit codes for configuration errors
//! - JSON log output
//!
//! All tests run the real binary via std::process::Command against temp
//! directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn perfdash_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_perfdash"))
}

fn run(args: &[&str]) -> Output {
    Command::new(perfdash_binary())
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("PERFDASH_SETTINGS")
        .output()
        .unwrap()
}

// Test helper: two builds of one job plus a description file selecting them
fn create_workspace() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    for build in ["101", "102"] {
        let artifacts = temp_dir
            .path()
            .join("logs")
            .join("ci-kubernetes-e2e-gce-scale")
            .join(build)
            .join("artifacts");
        fs::create_dir_all(&artifacts).unwrap();
        fs::write(
            artifacts.join("APIResponsiveness_load_2024.json"),
            r#"{"version": "v1", "dataItems": [{"data": {"Perc50": 1.5, "Perc99": 9.0}, "unit": "ms", "labels": {"Metric": "LIST pods"}}]}"#,
        )
        .unwrap();
    }

    fs::write(
        temp_dir.path().join("descriptions.yaml"),
        r#"
jobs:
  - job: ci-kubernetes-e2e-gce-scale
    prefix: gce-5000Nodes
    categories:
      APIResponsiveness:
        "LIST pods":
          - outputFilePrefix: APIResponsiveness
"#,
    )
    .unwrap();
    temp_dir
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_once_collects_local_artifacts() {
    let workspace = create_workspace();
    let output = run(&[
        "--once",
        "--log-format",
        "json",
        "--mode",
        "local",
        "--local-root",
        path_arg(&workspace.path().join("logs")),
        "--config-path",
        path_arg(&workspace.path().join("descriptions.yaml")),
    ]);

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stats = stdout
        .lines()
        .find(|line| line.contains("Refresh statistics"))
        .expect("statistics line");
    let stats: serde_json::Value = serde_json::from_str(stats).unwrap();
    assert_eq!(stats["fields"]["merged"], 2);
    assert_eq!(stats["fields"]["fetch_errors"], 0);
}

#[test]
fn test_missing_descriptions_is_config_error() {
    let output = run(&["--once"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no test descriptions"));
}

#[test]
fn test_unreadable_description_file_is_config_error() {
    let output = run(&["--once", "--config-path", "/nonexistent/descriptions.yaml"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_invalid_flag_is_rejected() {
    let output = run(&["--mode", "ftp"]);
    assert!(!output.status.success());
}
