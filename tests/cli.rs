mod common;

use assert_cmd::Command;
use common::{iso, semi_monthly_paydays};
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

fn cli(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("cadence_cli").unwrap();
    cmd.arg("--config")
        .arg(config_dir.path().join("detection.json"));
    cmd
}

#[test]
fn prints_ranked_matches_as_json() {
    let dir = TempDir::new().unwrap();
    let output = cli(&dir)
        .args(["--today", "2018-05-10"])
        .args(iso(&semi_monthly_paydays()))
        .output()
        .unwrap();
    assert!(output.status.success());

    let results: Value = serde_json::from_slice(&output.stdout).unwrap();
    let best = &results[0];
    assert_eq!(best["family"], "semi_monthly");
    assert_eq!(best["params"], serde_json::json!([5, 20]));
    assert_eq!(best["roll_policy"], -1);
    assert_eq!(best["confidence_percent"], 100);
}

#[test]
fn prints_empty_list_when_nothing_fits() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["--today", "2018-03-16", "2018-03-15"])
        .assert()
        .success()
        .stdout(contains("[]"));
}

#[test]
fn single_flag_accepts_one_observation() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["--single", "--today", "2018-03-16", "2018-03-15"])
        .assert()
        .success()
        .stdout(contains("\"match_count\": 1"));
}

#[test]
fn rejects_malformed_dates() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["--today", "2018-05-10", "2018-13-01"])
        .assert()
        .failure()
        .code(1)
        .stderr(contains("invalid date"));
}

#[test]
fn rejects_missing_dates() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .assert()
        .failure()
        .stderr(contains("at least one observation date"));
}

#[test]
fn rejects_invalid_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("detection.json"), r#"{"recency_decay": 2.0}"#).unwrap();
    cli(&dir)
        .args(["--today", "2018-03-16", "2018-03-15"])
        .assert()
        .failure()
        .stderr(contains("Invalid configuration"));
}
