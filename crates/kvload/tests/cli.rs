//! Binary behavior: argument handling, exit codes, dry runs

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn kvload() -> Command {
    let mut cmd = Command::cargo_bin("kvload").unwrap();
    cmd.env_remove("RUST_LOG")
        .env("KVLOAD_PAUSE_SECS", "0")
        .env("LOG_OUTPUT", "file");
    cmd
}

#[test]
fn test_missing_source_argument_exits_1() {
    kvload().assert().code(1);
}

#[test]
fn test_nonexistent_source_exits_1() {
    let dir = tempfile::tempdir().unwrap();

    kvload()
        .arg(dir.path().join("missing.jsonl"))
        .arg("--dry-run")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_help() {
    kvload()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--max-in-flight"));
}

#[test]
fn test_dry_run_reports_errors_and_exits_0() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("files.jsonl");
    let mut file = std::fs::File::create(&source).unwrap();
    writeln!(file, r#"{{"fileId":{{"b":"ZmlsZTE="}}}}"#).unwrap();
    writeln!(file, "not-json").unwrap();
    drop(file);

    let errors = dir.path().join("errors");
    let logs = dir.path().join("logs");

    kvload()
        .arg(&source)
        .arg("--dry-run")
        .arg("--error-dir")
        .arg(&errors)
        .arg("--log-dir")
        .arg(&logs)
        .assert()
        .success()
        .stdout(predicate::str::contains("source file ended and closed..."))
        .stdout(predicate::str::contains("finished and ended with error..."));

    let error_files: Vec<_> = std::fs::read_dir(&errors).unwrap().collect();
    assert_eq!(error_files.len(), 1);
    let path = error_files[0].as_ref().unwrap().path();
    assert!(path.file_name().unwrap().to_string_lossy().starts_with("errorData_"));
    assert_eq!(std::fs::read_to_string(path).unwrap(), "not-json\n");

    assert_eq!(std::fs::read_dir(&logs).unwrap().count(), 1);
}

#[test]
fn test_dry_run_clean_file() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("files.jsonl");
    std::fs::write(&source, "{\"fileId\":{\"s\":\"a\"}}\n{\"fileId\":{\"s\":\"b\"}}\n").unwrap();

    kvload()
        .arg(&source)
        .arg("--dry-run")
        .arg("--error-dir")
        .arg(dir.path())
        .arg("--log-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("finished and all success!"));
}

#[test]
fn test_invalid_flag_value_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("files.jsonl");
    std::fs::write(&source, "").unwrap();

    kvload()
        .arg(&source)
        .arg("--dry-run")
        .arg("--max-in-flight")
        .arg("0")
        .arg("--error-dir")
        .arg(dir.path())
        .arg("--log-dir")
        .arg(dir.path())
        .assert()
        .code(1);
}
