// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const TEST_GRAPH: &str = r#"{
    "A": [["I", 0, 2], ["C", 0, 2]],
    "B": [["I", 1, 2], ["A", 0, 2]],
    "O": [["B", 0, 2], ["A", 1, 2]],
    "U": [["I", 2, 2]],
    "C": [["42", 2]]
}"#;

const F_WITHOUT_P: &str = r#"{"F": [["I", 0, 1]], "O": [["I", 1, 2]]}"#;

fn egp(config_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("egp-cli").unwrap();
    cmd.arg("--config-dir").arg(config_dir);
    cmd
}

fn write(dir: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn validate_accepts_a_clean_graph() {
    let dir = TempDir::new().unwrap();
    let graph = write(&dir, "graph.json", TEST_GRAPH);
    egp(dir.path())
        .arg("validate")
        .arg(&graph)
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"));
}

#[test]
fn validate_lists_findings_and_fails() {
    let dir = TempDir::new().unwrap();
    let graph = write(&dir, "graph.json", F_WITHOUT_P);
    egp(dir.path())
        .arg("validate")
        .arg(&graph)
        .assert()
        .failure()
        .stdout(predicate::str::contains("E01006"))
        .stderr(predicate::str::contains("finding"));
}

#[test]
fn validate_flags_a_non_bool_condition() {
    let dir = TempDir::new().unwrap();
    let text = r#"{"F": [["I", 0, 2]], "O": [["I", 0, 2]], "P": [["I", 0, 2]]}"#;
    let graph = write(&dir, "graph.json", text);
    egp(dir.path())
        .arg("validate")
        .arg(&graph)
        .assert()
        .failure()
        .stdout(predicate::str::contains("E01021"));
}

#[test]
fn malformed_graph_is_an_error() {
    let dir = TempDir::new().unwrap();
    let graph = write(&dir, "graph.json", r#"{"Q": [["I", 0, 2]]}"#);
    egp(dir.path())
        .arg("validate")
        .arg(&graph)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid JSON graph"));
}

#[test]
fn normalized_output_validates() {
    let dir = TempDir::new().unwrap();
    let graph = write(&dir, "graph.json", TEST_GRAPH);
    let out = dir.path().join("normalized.json");
    egp(dir.path())
        .arg("normalize")
        .arg(&graph)
        .arg("--out")
        .arg(&out)
        .assert()
        .success();
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.contains("\"O\""));
    egp(dir.path()).arg("validate").arg(&out).assert().success();
}

#[test]
fn config_show_persists_defaults() {
    let dir = TempDir::new().unwrap();
    egp(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"capacity\": 65536"));
    assert!(dir.path().join("cache.json").is_file());
}

#[test]
fn config_set_is_persisted_and_validated() {
    let dir = TempDir::new().unwrap();
    egp(dir.path())
        .args(["config", "set", "--capacity", "128"])
        .assert()
        .success();
    egp(dir.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"capacity\": 128"));
    egp(dir.path())
        .args(["config", "set", "--purge-fraction", "1.5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GCC_INVALID_CONFIG"));
}

#[test]
fn churn_reports_purges_as_json() {
    let dir = TempDir::new().unwrap();
    let argv = [
        "churn",
        "--trees",
        "20",
        "--depth",
        "2",
        "--capacity",
        "16",
        "--seed",
        "7",
        "--json",
    ];
    let output = egp(dir.path()).args(argv).output().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "{stderr}");
    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["trees"], 20);
    assert_eq!(summary["capacity"], 16);
    assert_eq!(summary["consistent"], true);
    assert!(summary["purges"].as_u64().unwrap() > 0);
}

#[test]
fn churn_rejects_trees_larger_than_the_cache() {
    let dir = TempDir::new().unwrap();
    egp(dir.path())
        .args(["churn", "--trees", "1", "--depth", "4", "--capacity", "8"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not fit the cache"));
}
