//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary HOME so the
//! config file and database never leak between tests.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_heatlog"))
        .args(args)
        .env("HOME", home)
        .env("HEATLOG_ENV", "dev")
        .env_remove("HEATLOG_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn feedback(
    home: &Path,
    owner: &str,
    heating_time: &str,
    satisfaction: &str,
) -> (i32, String, String) {
    run_cli(
        home,
        &[
            "feedback",
            "--owner",
            owner,
            "--duration",
            "15",
            "--temperature",
            "22",
            "--heating-time",
            heating_time,
            "--satisfaction",
            satisfaction,
        ],
    )
}

#[test]
fn test_predict_cold_start_json() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(
        home.path(),
        &["predict", "--owner", "alice", "--duration", "15", "--temperature", "22", "--json"],
    );
    assert_eq!(code, 0, "predict failed");

    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["source"], "cold_start");
    assert_eq!(parsed["heating_time"].as_f64(), Some(10.0));
}

#[test]
fn test_feedback_then_history() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = feedback(home.path(), "alice", "10", "50");
    assert_eq!(code, 0, "feedback failed");
    assert!(stdout.contains("Recorded:"));

    let (code, stdout, _) = run_cli(home.path(), &["history", "--owner", "alice", "--json"]);
    assert_eq!(code, 0, "history failed");
    let rows: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["owner"], "alice");
    assert_eq!(rows[0]["heating_time"].as_f64(), Some(10.0));
}

#[test]
fn test_feedback_out_of_range_is_rejected() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = feedback(home.path(), "alice", "10", "250");
    assert_eq!(code, 1);
    assert!(stderr.starts_with("error:"));

    let (_, stdout, _) = run_cli(home.path(), &["history"]);
    assert!(stdout.contains("No observations."));
}

#[test]
fn test_delete_owner() {
    let home = tempfile::tempdir().unwrap();
    feedback(home.path(), "alice", "10", "50");
    feedback(home.path(), "alice", "12", "60");
    feedback(home.path(), "bob", "9", "50");

    let (code, stdout, _) = run_cli(home.path(), &["delete", "--owner", "alice"]);
    assert_eq!(code, 0, "delete failed");
    assert!(stdout.contains("Deleted 2"));

    let (_, stdout, _) = run_cli(home.path(), &["history", "--json"]);
    let rows: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
}

#[test]
fn test_delete_requires_a_target() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["delete"]);
    assert_ne!(code, 0);
}

#[test]
fn test_delete_unknown_id_fails() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["delete", "no-such-id"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_config_set_get_reset() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["config", "set", "store.user_history_limit", "50"]);
    assert_eq!(code, 0, "config set failed");

    let (_, stdout, _) = run_cli(home.path(), &["config", "get", "store.user_history_limit"]);
    assert_eq!(stdout.trim(), "50");

    run_cli(home.path(), &["config", "reset"]);
    let (_, stdout, _) = run_cli(home.path(), &["config", "get", "store.user_history_limit"]);
    assert_eq!(stdout.trim(), "400");
}

#[test]
fn test_config_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_list() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["config", "list"]);
    assert_eq!(code, 0, "config list failed");
    assert!(stdout.contains("predictor.variant = kernel"));
}

#[test]
fn test_simulate_json() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(
        home.path(),
        &["simulate", "--days", "10", "--seed", "7", "--json"],
    );
    assert_eq!(code, 0, "simulate failed");

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["seed"].as_u64(), Some(7));
    assert_eq!(report["days"].as_array().unwrap().len(), 10);
}

#[test]
fn test_simulate_rejects_unknown_variant() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["simulate", "--variant", "oracle"]);
    assert_ne!(code, 0);
}
