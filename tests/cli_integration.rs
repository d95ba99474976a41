//! Integration tests for the githubfile binary.
//!
//! These tests only run offline commands and argument validation, so they
//! never need GitHub credentials.

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a command for running githubfile with no ambient configuration.
fn githubfile() -> Command {
    let mut cmd = Command::cargo_bin("githubfile").unwrap();
    for var in [
        "GITHUB_TOKEN",
        "GITHUB_EMAIL",
        "GITHUB_USERNAME",
        "GITHUBFILE_CONFIG",
        "XDG_CONFIG_HOME",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn version_flag_works() {
    githubfile()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("githubfile"));
}

#[test]
fn id_encode() {
    githubfile()
        .args([
            "id", "encode", "--owner", "acme", "--repo", "infra", "--branch", "main", "--path",
            "teams/README.md",
        ])
        .assert()
        .success()
        .stdout("acme/infra:main:teams/README.md\n");
}

#[test]
fn id_encode_rejects_empty_component() {
    githubfile()
        .args([
            "id", "encode", "--owner", "acme", "--repo", "infra", "--branch", "", "--path", "f",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error:"));
}

#[test]
fn id_decode_prints_key_json() {
    let output = githubfile()
        .args(["id", "decode", "acme/infra:release/1.0:a/b.txt"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let key: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        key,
        serde_json::json!({
            "repository_owner": "acme",
            "repository_name": "infra",
            "branch": "release/1.0",
            "path": "a/b.txt"
        })
    );
}

#[test]
fn id_decode_malformed() {
    githubfile()
        .args(["id", "decode", "acme-infra:main:f"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("as a file id"));
}

#[test]
fn read_malformed_id_fails_before_config() {
    githubfile()
        .args(["read", "not-an-id"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("as a file id"));
}

#[test]
fn missing_config_names_setting() {
    let home = tempfile::TempDir::new().unwrap();
    githubfile()
        .env("HOME", home.path())
        .args(["delete", "acme/infra:main:f.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("github_token"));
}

#[test]
fn config_file_with_unknown_key_is_rejected() {
    let dir = tempfile::TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "github_tokn = \"t\"\n").unwrap();

    githubfile()
        .arg("--config")
        .arg(&config)
        .args(["read", "acme/infra:main:f.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to parse config file"));
}

#[test]
fn create_requires_contents() {
    githubfile()
        .args([
            "create", "--owner", "acme", "--repo", "infra", "--branch", "main", "--path", "f",
        ])
        .assert()
        .failure();
}

#[test]
fn completion_bash() {
    githubfile()
        .args(["completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("githubfile"));
}
