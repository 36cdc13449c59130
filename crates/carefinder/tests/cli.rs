use assert_cmd::prelude::*;

use predicates::prelude::*;
use predicates::str::contains;
use serial_test::serial;
use std::process::Command;

fn server_cmd() -> Command {
  let mut cmd = Command::cargo_bin("carefinder_server").expect("binary exists");
  cmd.env_remove("CAREFINDER_STORE").env_remove("CAREFINDER_ENCODER");
  cmd
}

#[test]
#[serial]
fn test_help_lists_configuration_flags() {
  server_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(contains("--corpus").and(contains("--data-dir")).and(contains("--llm-api-key")).and(contains("--top-k")));
}

#[test]
#[serial]
fn test_version_flag() {
  server_cmd().arg("--version").assert().success().stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[cfg(feature = "onnx")]
#[test]
#[serial]
fn test_help_shows_onnx_as_default_encoder() {
  server_cmd().arg("--help").assert().success().stdout(contains("[default: onnx]"));
}

#[test]
#[serial]
fn test_rejects_unknown_store_backend() {
  server_cmd().args(["--store", "postgres"]).assert().failure().stderr(contains("invalid value"));
}

#[test]
#[serial]
fn test_missing_corpus_fails_startup() {
  let temp = tempfile::TempDir::new().unwrap();
  server_cmd()
    .args(["--data-dir"])
    .arg(temp.path())
    .args(["--store", "memory", "--encoder", "hashing", "--no-tracking", "--bind", "127.0.0.1:0", "--corpus"])
    .arg(temp.path().join("missing.json"))
    .assert()
    .failure()
    .stderr(contains("Failed to read corpus file"));
}
