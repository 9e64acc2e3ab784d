//! Integration tests for the adaptest binary
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const DATASET: &str = "tests/data/reference_dataset.json";

#[test]
fn test_text_report() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("adaptest");
    cmd.arg("--input").arg(DATASET).arg("--quick");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("AUTOML SUPERIOR TO STATIC"))
        .stdout(predicate::str::contains("AutoML vs Static"))
        .stdout(predicate::str::contains("Protocols (2 compared"))
        .stdout(predicate::str::contains("AutoML found significantly more"));
}

#[test]
fn test_json_report_parses() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("adaptest");
    cmd.arg("--input")
        .arg(DATASET)
        .arg("--format")
        .arg("json")
        .arg("--quick");

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);

    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["verdict"], "automl_superior");
    assert_eq!(parsed["complete"], true);
    assert_eq!(parsed["sample"]["n_paired"], 6);
    assert_eq!(parsed["sample"]["static_only_experiments"], 1);
    assert_eq!(parsed["sample"]["experiments_with_random"], 5);
    assert!(parsed["primary"]["primary"]["reject_h0"].as_bool().unwrap());
    assert_eq!(parsed["protocol_breakdown"]["protocols"][1]["protocol"], "mqtt");
    assert_eq!(
        parsed["protocol_breakdown"]["multiple_comparison"]["recommended"],
        "holm"
    );
    assert!(parsed["conclusion"]["text_pt"].as_str().unwrap().contains("AutoML"));
    assert!(parsed["independent_test"].is_object());
    assert_eq!(parsed["raw_pairs"].as_array().unwrap().len(), 6);
}

#[test]
fn test_same_seed_same_output() {
    let run = || {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("adaptest");
        cmd.arg("-i")
            .arg(DATASET)
            .arg("--format")
            .arg("json")
            .arg("--quick")
            .arg("--seed")
            .arg("11");
        cmd.output().unwrap().stdout
    };
    assert_eq!(run(), run());
}

#[test]
fn test_config_file_applied() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "significance_level = 0.01").unwrap();
    writeln!(config, "bootstrap_resamples = 500").unwrap();
    writeln!(config, "permutation_resamples = 500").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("adaptest");
    cmd.arg("-i")
        .arg(DATASET)
        .arg("--config")
        .arg(config.path())
        .arg("--format")
        .arg("json");

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["config"]["significance_level"], 0.01);
    assert_eq!(parsed["permutation_test"]["n_permutations"], 500);
}

#[test]
fn test_insufficient_data_is_not_an_error() {
    let mut dataset = NamedTempFile::new().unwrap();
    write!(
        dataset,
        r#"{{ "experiments": [ {{ "experiment_id": "only", "static": {{ "vulns_found": 3, "tests_executed": 20, "execution_time_sec": 30.0 }}, "automl": {{ "vulns_found": 8, "tests_executed": 25, "execution_time_sec": 40.0 }} }} ] }}"#
    )
    .unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("adaptest");
    cmd.arg("-i").arg(dataset.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("INSUFFICIENT DATA"))
        .stdout(predicate::str::contains("1 paired experiments available"));
}

#[test]
fn test_missing_input_file_fails() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("adaptest");
    cmd.arg("-i").arg("does/not/exist.json");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_malformed_dataset_fails() {
    let mut dataset = NamedTempFile::new().unwrap();
    write!(dataset, "{{ \"experiments\": [ {{ \"experiment_id\": 5 }} ] }}").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("adaptest");
    cmd.arg("-i").arg(dataset.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid dataset"));
}

#[test]
fn test_invalid_config_fails() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "confidence_level = 1.5").unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("adaptest");
    cmd.arg("-i").arg(DATASET).arg("-c").arg(config.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Invalid analysis configuration"));
}

#[test]
fn test_debug_logs_to_stderr() {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("adaptest");
    cmd.arg("-i").arg(DATASET).arg("--quick").arg("--debug");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("analysis complete"));
}

#[test]
fn test_duplicate_experiment_row_is_skipped_with_warning() {
    let row = |id: &str, s: u32, a: u32| {
        format!(
            r#"{{ "experiment_id": "{}",
                 "static": {{ "vulns_found": {}, "tests_executed": 20, "execution_time_sec": 30.0 }},
                 "automl": {{ "vulns_found": {}, "tests_executed": 25, "execution_time_sec": 40.0 }} }}"#,
            id, s, a
        )
    };
    let rows = [row("e1", 3, 8), row("e2", 3, 7), row("e3", 3, 9), row("e3", 3, 2)];
    let mut dataset = NamedTempFile::new().unwrap();
    write!(dataset, r#"{{ "experiments": [ {} ] }}"#, rows.join(",")).unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("adaptest");
    cmd.arg("-i")
        .arg(dataset.path())
        .arg("--format")
        .arg("json")
        .arg("--quick");

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["complete"], true);
    assert_eq!(parsed["sample"]["n_paired"], 3);

    let warnings = parsed["warnings"].as_array().unwrap();
    assert!(warnings.iter().any(|w| {
        w["block"] == "input"
            && w["reason"]
                .as_str()
                .unwrap()
                .contains("Duplicate experiment identifier: e3")
    }));
}

#[test]
fn test_invalid_row_is_skipped_with_warning() {
    let mut dataset = NamedTempFile::new().unwrap();
    write!(
        dataset,
        r#"{{ "experiments": [
            {{ "experiment_id": "ok-1",
               "static": {{ "vulns_found": 3, "tests_executed": 20, "execution_time_sec": 30.0 }},
               "automl": {{ "vulns_found": 8, "tests_executed": 25, "execution_time_sec": 40.0 }} }},
            {{ "experiment_id": "ok-2",
               "static": {{ "vulns_found": 2, "tests_executed": 20, "execution_time_sec": 31.0 }},
               "automl": {{ "vulns_found": 6, "tests_executed": 25, "execution_time_sec": 41.0 }} }},
            {{ "experiment_id": "broken",
               "static": {{ "vulns_found": 2, "tests_executed": 0, "execution_time_sec": 31.0 }},
               "automl": {{ "vulns_found": 6, "tests_executed": 25, "execution_time_sec": 41.0 }} }}
        ] }}"#
    )
    .unwrap();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("adaptest");
    cmd.arg("-i").arg(dataset.path()).arg("--quick");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Paired experiments: 2"))
        .stdout(predicate::str::contains("input: Invalid observation 'broken'"));
}
