// curationgym/tests/cli.rs
//! End-to-end CLI tests: curate a tiny JSONL corpus, inspect the resulting
//! artifact, resume a run whose checkpoint already marks everything
//! complete, and purge an artifact from a store.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn curationgym() -> Command {
    Command::new(assert_cmd::cargo_bin!("curationgym"))
}

fn write_policy(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("policy.yaml");
    fs::write(
        &path,
        "name: test-policy\nseed: 7\nlanguage:\n  target: en\n  min_score: 0.0\n",
    )
    .unwrap();
    path
}

fn write_input(dir: &std::path::Path) -> std::path::PathBuf {
    let input_dir = dir.join("input");
    fs::create_dir_all(&input_dir).unwrap();
    fs::write(
        input_dir.join("shard-0.jsonl"),
        concat!(
            "{\"id\":\"a\",\"text\":\"a perfectly ordinary sentence about cats and dogs\"}\n",
            "{\"id\":\"b\",\"text\":\"a perfectly ordinary sentence about birds and fish\"}\n",
        ),
    )
    .unwrap();
    input_dir
}

#[test]
fn curate_then_inspect_round_trips_a_manifest() {
    let dir = tempdir().unwrap();
    let policy = write_policy(dir.path());
    let input = write_input(dir.path());
    let output = dir.path().join("out");

    curationgym()
        .args(["curate", "--policy"])
        .arg(&policy)
        .args(["--input"])
        .arg(&input)
        .args(["--output"])
        .arg(&output)
        .args(["--run-id", "run-1"])
        .assert()
        .success();

    assert!(output.join("manifest.json").is_file());
    assert!(output.join("slice_stats.json").is_file());
    assert!(output.join("run_stamp.json").is_file());
    assert!(output.join("execution_state.json").is_file());

    curationgym()
        .arg("inspect")
        .arg("--artifact")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("test-policy"))
        .stdout(predicate::str::contains("total_docs"));
}

#[test]
fn resuming_a_completed_run_reports_nothing_left_to_do() {
    let dir = tempdir().unwrap();
    let policy = write_policy(dir.path());
    let input = write_input(dir.path());
    let output = dir.path().join("out");

    curationgym()
        .args(["curate", "--policy"])
        .arg(&policy)
        .args(["--input"])
        .arg(&input)
        .args(["--output"])
        .arg(&output)
        .args(["--run-id", "run-2"])
        .assert()
        .success();

    curationgym()
        .args(["resume", "--output"])
        .arg(&output)
        .args(["--input"])
        .arg(&input)
        .args(["--run-id", "run-2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 of 1 task(s) completed"));
}

#[test]
fn purge_reports_missing_artifact_without_failing() {
    let dir = tempdir().unwrap();
    let store = dir.path().join("store");
    fs::create_dir_all(&store).unwrap();

    curationgym()
        .args(["purge", "--store"])
        .arg(&store)
        .args(["--hash", "doesnotexist0000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("no artifact"));
}

#[test]
fn curate_without_a_policy_file_fails_cleanly() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path());
    let output = dir.path().join("out");

    curationgym()
        .args(["curate", "--policy"])
        .arg(dir.path().join("does-not-exist.yaml"))
        .args(["--input"])
        .arg(&input)
        .args(["--output"])
        .arg(&output)
        .assert()
        .failure();
}
