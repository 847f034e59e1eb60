//! Binary-level tests: startup, configuration handling and the three commands.
//!
//! Config loading must finish before anything else starts. When stdin is not
//! a terminal (assert_cmd pipes it) a missing config is an immediate error,
//! never a prompt.

mod common;

use assert_cmd::cargo::cargo_bin_cmd;
use common::TestHome;
use predicates::prelude::*;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

/// Helper: get a Command for the scan-snapshot binary with a clean environment.
fn scan_snapshot() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("scan-snapshot");
    cmd.env_remove("SCAN_SNAPSHOT_HOME")
        .env_remove("RUST_LOG")
        .timeout(Duration::from_secs(30));
    cmd
}

/// Helper: a command running against a prepared home via --config.
fn with_home(home: &TestHome) -> assert_cmd::Command {
    let mut cmd = scan_snapshot();
    cmd.current_dir(home.path()).arg("--config").arg(home.config_path());
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_missing_config_exits_fast_not_hangs() {
    let tmp = TempDir::new().expect("create temp dir");

    scan_snapshot()
        .current_dir(tmp.path())
        .args(["load", "pshtt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"))
        .stderr(predicate::str::contains("--init"));
}

#[test]
fn test_init_creates_config_file() {
    let tmp = TempDir::new().expect("create temp dir");
    let config_path = tmp.path().join("config").join("scan-snapshot.toml");

    assert!(!config_path.exists(), "config should not exist yet");

    scan_snapshot()
        .current_dir(tmp.path())
        .arg("--init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created default configuration file"));

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[paths]"), "config should have [paths] section");
    assert!(content.contains("[database]"), "config should have [database] section");
}

#[test]
fn test_init_honors_config_path() {
    let tmp = TempDir::new().expect("create temp dir");
    let config_path = tmp.path().join("elsewhere.toml");

    scan_snapshot()
        .current_dir(tmp.path())
        .arg("--init")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success();

    assert!(config_path.exists());
}

#[test]
fn test_help_works_without_config() {
    let tmp = TempDir::new().expect("create temp dir");

    scan_snapshot()
        .current_dir(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scan-snapshot"))
        .stdout(predicate::str::contains("load"));
}

#[test]
fn test_no_command_is_an_error() {
    let tmp = TempDir::new().expect("create temp dir");

    scan_snapshot()
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("A command is required"));
}

#[test]
fn test_invalid_config_reported() {
    let home = TestHome::new();
    fs::write(home.config_path(), "[paths]\nhome_dir = \"\"\n").unwrap();

    with_home(&home)
        .args(["load", "pshtt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_load_pshtt_reports_import() {
    let home = TestHome::new();

    with_home(&home)
        .args(["load", "pshtt"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Importing to \"scan\" database"))
        .stderr(predicate::str::contains("Successfully imported 5 documents"))
        .stdout(predicate::str::contains("=== RUN SUMMARY ==="))
        .stdout(predicate::str::contains("Documents Inserted: 5"))
        .stdout(predicate::str::contains("Unresolved Agencies: 1"));

    assert!(home.join("shared/scan.db").exists());
    assert!(home.join("shared/artifacts/unique-agencies.csv").exists());
}

#[test]
fn test_load_bad_results_fails_with_domain() {
    let home = TestHome::new();
    home.copy_fixture("pshtt-bad-max-age.csv", "shared/artifacts/results/pshtt.csv");

    with_home(&home)
        .args(["load", "pshtt", "--skip-exports"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("m.gov"))
        .stderr(predicate::str::contains("HSTS Max Age"));

    assert!(!home.join("shared/artifacts/unique-agencies.csv").exists());
}

#[test]
fn test_load_missing_inventory_fails() {
    let home = TestHome::new();
    home.remove("shared/artifacts/current-federal_modified.csv");

    with_home(&home)
        .args(["load", "sslyze"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("current-federal_modified.csv"));
}

#[test]
fn test_home_env_overrides_config() {
    let home = TestHome::new();
    let other = TestHome::new();

    // Config points at `home`, the environment redirects to `other`.
    with_home(&home)
        .env("SCAN_SNAPSHOT_HOME", other.path())
        .args(["load", "trustymail", "--skip-exports"])
        .assert()
        .success();

    assert!(other.join("shared/scan.db").exists());
    assert!(!home.join("shared/scan.db").exists());
}

#[test]
fn test_domains_command() {
    let home = TestHome::new();

    with_home(&home)
        .arg("domains")
        .assert()
        .success()
        .stderr(predicate::str::contains("Upserted 5 domain records"))
        .stdout(predicate::str::contains("Old Domain Records Deleted: 0"));
}

#[test]
fn test_latest_command_prints_json_lines() {
    let home = TestHome::new();

    with_home(&home).args(["load", "sslyze", "--skip-exports"]).assert().success();

    let output = with_home(&home)
        .args(["latest", "sslyze", "--domain", "z.gov"])
        .output()
        .expect("binary should run");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().filter(|l| !l.is_empty()).collect();
    assert_eq!(lines.len(), 1, "got: {}", stdout);
    let doc: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(doc["domain"], "z.gov");
    assert_eq!(doc["agency"]["id"], "ZED");
}

#[test]
fn test_log_file_export() {
    let home = TestHome::new();
    let log_path = home.join("logs/run.log");

    with_home(&home)
        .args(["load", "pshtt", "--skip-exports", "--log-file"])
        .arg(&log_path)
        .assert()
        .success();

    let log = fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("Successfully imported 5 documents"));
}
