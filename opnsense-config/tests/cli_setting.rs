use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn fixture(path: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join(path)
}

fn cli() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("opnsense-config"));
    cmd.env("NO_COLOR", "1")
        .arg("--opnsense-version")
        .arg("OPNsense 24.1.2_1");
    cmd
}

#[test]
fn version_reports_matched_schema() {
    cli()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("schema=24.1"))
        .stdout(predicate::str::contains("source=embedded"));
}

#[test]
fn unsupported_version_fails() {
    Command::new(assert_cmd::cargo::cargo_bin!("opnsense-config"))
        .args(["--opnsense-version", "OPNsense 19.7", "version"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("19.7"));
}

#[test]
fn get_prints_setting_value() {
    cli()
        .arg("--config")
        .arg(fixture("fixtures/opnsense-config.xml"))
        .args(["get", "system_settings_general", "hostname"])
        .assert()
        .success()
        .stdout(predicate::str::diff("fw01\n"));
}

#[test]
fn get_json_includes_resolved_path() {
    cli()
        .arg("--config")
        .arg(fixture("fixtures/opnsense-config.xml"))
        .args(["--format", "json", "get", "system_settings_general", "domain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"path\": \"system/domain\""))
        .stdout(predicate::str::contains("\"value\": \"example.org\""));
}

#[test]
fn set_writes_and_reports_diff() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("config.xml");
    fs::copy(fixture("fixtures/opnsense-config.xml"), &config).expect("copy fixture");

    cli()
        .arg("--config")
        .arg(&config)
        .args(["set", "system_high_availability_settings", "remote_system_username", "root"])
        .assert()
        .success()
        .stdout(predicate::str::contains("changed=true"))
        .stdout(predicate::str::contains("hasync/username: <none> -> root"));

    let written = fs::read_to_string(&config).expect("read config");
    assert!(written.contains("<username>root</username>"));
}

#[test]
fn set_on_container_fails() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("config.xml");
    fs::copy(fixture("fixtures/opnsense-config.xml"), &config).expect("copy fixture");

    cli()
        .arg("--config")
        .arg(&config)
        .args(["set", "system_settings_logging", "syslog", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("syslog"));
}

#[test]
fn set_json_reports_tree_changes() {
    let dir = tempdir().expect("tempdir");
    let config = dir.path().join("config.xml");
    fs::copy(fixture("fixtures/opnsense-config.xml"), &config).expect("copy fixture");

    cli()
        .arg("--config")
        .arg(&config)
        .args(["--format", "json", "set", "system_settings_general", "hostname", "fw02", "--check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"changed\": true"))
        .stdout(predicate::str::contains("\"path\": \"opnsense/system/hostname\""));

    let written = fs::read_to_string(&config).expect("read config");
    assert!(written.contains("<hostname>fw01</hostname>"));
}
