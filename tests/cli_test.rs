//! CLI end-to-end tests
//!
//! Tests for the filescraper command-line interface. None of these need
//! external tools installed.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the filescraper binary
#[allow(deprecated)]
fn filescraper_cmd() -> Command {
    Command::cargo_bin("filescraper").unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = filescraper_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = filescraper_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("filescraper"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_flag() {
    let mut cmd = filescraper_cmd();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("filescraper"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = filescraper_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_scrape_help_lists_overrides() {
    let mut cmd = filescraper_cmd();
    cmd.args(["scrape", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--mimetype"))
        .stdout(predicate::str::contains("--no-wellformed"));
}

#[test]
fn test_cli_scrape_missing_file() {
    let mut cmd = filescraper_cmd();
    cmd.args(["scrape", "/nonexistent/file.pdf"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Well-formed: no"))
        .stdout(predicate::str::contains("FileExists"))
        .stdout(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_scrape_missing_file_json() {
    let mut cmd = filescraper_cmd();
    let output = cmd
        .args(["scrape", "--json", "/nonexistent/file.pdf"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["well_formed"], false);
    assert_eq!(json["mimetype"], "(:unav)");
    assert_eq!(json["info"]["0"]["class"], "FileExists");
}

#[test]
fn test_cli_scrape_rejects_bad_param() {
    let mut cmd = filescraper_cmd();
    cmd.args(["scrape", "--param", "novalue", "/nonexistent/file.pdf"])
        .assert()
        .failure();
}

#[test]
fn test_cli_checksum() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("abc.txt");
    fs::write(&file, "abc").unwrap();

    let mut cmd = filescraper_cmd();
    cmd.arg("checksum")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        ));
}

#[test]
fn test_cli_checksum_sha512() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("abc.txt");
    fs::write(&file, "abc").unwrap();

    let mut cmd = filescraper_cmd();
    cmd.args(["checksum", "--algorithm", "SHA-512"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("ddaf35a193617aba"));
}

#[test]
fn test_cli_checksum_unknown_algorithm() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("abc.txt");
    fs::write(&file, "abc").unwrap();

    let mut cmd = filescraper_cmd();
    cmd.args(["checksum", "--algorithm", "md5"])
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("algorithm"));
}

#[test]
fn test_cli_checksum_missing_file() {
    let mut cmd = filescraper_cmd();
    cmd.args(["checksum", "/nonexistent/file.bin"])
        .assert()
        .failure();
}

#[test]
fn test_cli_validate_no_config() {
    let mut cmd = filescraper_cmd();
    cmd.arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("defaults"));
}

#[test]
fn test_cli_validate_config_file() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("filescraper.toml");
    fs::write(
        &config,
        "[scrape]\ncheck_wellformed = false\n\n[tools]\njhove_path = \"/opt/jhove/jhove\"\n",
    )
    .unwrap();

    let mut cmd = filescraper_cmd();
    cmd.arg("validate")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Check well-formedness: false"))
        .stdout(predicate::str::contains("jhove: /opt/jhove/jhove"));
}

#[test]
fn test_cli_validate_invalid_config() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("broken.toml");
    fs::write(&config, "[scrape\ncheck_wellformed = 1").unwrap();

    let mut cmd = filescraper_cmd();
    cmd.arg("validate").arg(&config).assert().failure();
}

#[test]
fn test_cli_check_tools_command() {
    let mut cmd = filescraper_cmd();
    cmd.arg("check-tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("xmllint"));
}
