//! Integration tests for the dialcheck CLI.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

const ENV_KEYS: [&str; 5] = [
    "DIALCHECK_BATCH_SIZE",
    "DIALCHECK_INTER_BATCH_DELAY",
    "DIALCHECK_THROTTLE_GRACE",
    "DIALCHECK_MIN_DIGITS",
    "DIALCHECK_MAX_DIGITS",
];

/// Workspace with an explicit config, a directory and an input list.
fn setup() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("dialcheck.toml");
    std::fs::write(
        &config,
        "[resolution]\nbatch_size = 2\ninter_batch_delay_secs = 0\nthrottle_grace_secs = 0\n",
    )
    .unwrap();
    std::fs::write(temp_dir.path().join("directory.txt"), "+584162314157\n15551234567\n").unwrap();
    std::fs::write(
        temp_dir.path().join("numbers.txt"),
        "+58 416 231 4157\n584167562626\n15551234567\nnot a number\n15557654321\n",
    )
    .unwrap();
    (temp_dir, config)
}

fn dialcheck(dir: &TempDir, config: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("dialcheck").unwrap();
    cmd.current_dir(dir.path()).env("NO_COLOR", "1").arg("--config").arg(config);
    for key in ENV_KEYS {
        cmd.env_remove(key);
    }
    cmd
}

#[test]
fn test_check_json_output() {
    let (dir, config) = setup();
    let output = dialcheck(&dir, &config)
        .args(["check", "numbers.txt", "--directory", "directory.txt", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let found: Vec<&str> =
        result["found"].as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
    assert_eq!(found, vec!["+15551234567", "+584162314157"]);
    assert_eq!(result["not_found"].as_array().unwrap().len(), 2);
    assert!(result["unresolved"].as_array().unwrap().is_empty());
    assert_eq!(result["batches"].as_array().unwrap().len(), 2);
}

#[test]
fn test_check_human_output_and_csv() {
    let (dir, config) = setup();
    dialcheck(&dir, &config)
        .args(["check", "numbers.txt", "--directory", "directory.txt", "--csv", "out.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Checked:    4"))
        .stdout(predicate::str::contains("+584162314157"))
        .stderr(predicate::str::contains("batch 2/2"));

    let csv = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
    assert!(csv.starts_with("status,identifier\n"));
    assert!(csv.contains("found,+15551234567"));
    assert!(csv.contains("not_found,+15557654321"));
}

#[test]
fn test_check_csv_write_failure() {
    let (dir, config) = setup();
    dialcheck(&dir, &config)
        .args(["check", "numbers.txt", "--directory", "directory.txt", "--csv", "missing/out.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to write CSV file"));
}

#[test]
fn test_check_reads_stdin() {
    let (dir, config) = setup();
    dialcheck(&dir, &config)
        .args(["check", "--directory", "directory.txt", "--json"])
        .write_stdin("15551234567\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("+15551234567"));
}

#[test]
fn test_check_rejects_input_without_numbers() {
    let (dir, config) = setup();
    dialcheck(&dir, &config)
        .args(["check", "--directory", "directory.txt"])
        .write_stdin("hello\n12345\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No valid phone numbers"));
}

#[test]
fn test_check_rejects_zero_batch_size() {
    let (dir, config) = setup();
    dialcheck(&dir, &config)
        .args(["check", "numbers.txt", "--directory", "directory.txt", "--batch-size", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn test_check_missing_directory_file() {
    let (dir, config) = setup();
    dialcheck(&dir, &config)
        .args(["check", "numbers.txt", "--directory", "missing.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load directory"));
}

#[test]
fn test_normalize_prints_canonical_numbers() {
    let (dir, config) = setup();
    dialcheck(&dir, &config)
        .args(["normalize", "numbers.txt", "--min-digits", "12"])
        .assert()
        .success()
        .stdout("+584162314157\n+584167562626\n");
}

#[test]
fn test_config_prints_effective_values() {
    let (dir, config) = setup();
    dialcheck(&dir, &config)
        .env("DIALCHECK_THROTTLE_GRACE", "9")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("batch_size = 2"))
        .stdout(predicate::str::contains("throttle_grace_secs = 9"))
        .stdout(predicate::str::contains("page_size = 50"));
}

#[test]
fn test_config_rejects_bad_env_override() {
    let (dir, config) = setup();
    dialcheck(&dir, &config)
        .env("DIALCHECK_BATCH_SIZE", "lots")
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("DIALCHECK_BATCH_SIZE"));
}
