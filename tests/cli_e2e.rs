//! End-to-end smoke tests for the CLI binary.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_describes_required_flags() {
    Command::cargo_bin("coursesync")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--base-url"))
        .stdout(predicate::str::contains("--course"))
        .stdout(predicate::str::contains("--output"));
}

#[test]
fn test_version_prints_package_version() {
    Command::cargo_bin("coursesync")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_required_args_fails() {
    Command::cargo_bin("coursesync")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("--base-url"));
}

#[test]
fn test_missing_token_is_a_clear_error() {
    Command::cargo_bin("coursesync")
        .unwrap()
        .env_remove("COURSESYNC_TOKEN")
        .args([
            "--base-url",
            "https://campus.example.edu",
            "--course",
            "_c1_1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("COURSESYNC_TOKEN"));
}
