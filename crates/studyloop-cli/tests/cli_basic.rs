//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with HOME pointed at a temporary directory,
//! so every test starts from an empty database and default config.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_studyloop"))
        .args(args)
        .env("HOME", home)
        .env_remove("STUDYLOOP_ENV")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn run_ok(home: &Path, args: &[&str]) -> String {
    let (stdout, stderr, code) = run_cli(home, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    stdout
}

/// Parse the JSON document that follows any leading status lines.
fn json_tail(stdout: &str) -> serde_json::Value {
    let start = stdout
        .find(|c| c == '{' || c == '[')
        .expect("no JSON in output");
    serde_json::from_str(&stdout[start..]).expect("Failed to parse JSON output")
}

#[test]
fn test_task_add_requires_known_subject() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["task", "add", "Read", "--subject", "Math"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error: Validation error: Unknown subject: Math"));
}

#[test]
fn test_task_add_and_list() {
    let home = tempfile::tempdir().unwrap();
    run_ok(home.path(), &["subject", "add", "Math"]);
    let stdout = run_ok(
        home.path(),
        &["task", "add", "Read chapter 3", "--subject", "Math", "--review"],
    );
    assert!(stdout.starts_with("Task created: task-"));
    let task = json_tail(&stdout);
    assert_eq!(task["text"], "Read chapter 3");
    assert_eq!(task["reviewCycle"], "first");

    let list = json_tail(&run_ok(home.path(), &["task", "list", "--filter", "active"]));
    assert_eq!(list.as_array().unwrap().len(), 1);
    let done = json_tail(&run_ok(home.path(), &["task", "list", "--filter", "completed"]));
    assert!(done.as_array().unwrap().is_empty());
}

#[test]
fn test_collect_before_delay_changes_nothing() {
    let home = tempfile::tempdir().unwrap();
    run_ok(home.path(), &["subject", "add", "Math"]);
    let task = json_tail(&run_ok(home.path(), &["task", "add", "Read", "--subject", "Math"]));
    let id = task["id"].as_str().unwrap().to_string();

    run_ok(home.path(), &["task", "complete", &id]);
    let stdout = run_ok(home.path(), &["task", "collect", &id]);
    assert!(stdout.starts_with("Nothing to do"));
    let details = json_tail(&stdout);
    assert_eq!(details["rewardProgress"]["kind"], "completion");

    let wallet = json_tail(&run_ok(home.path(), &["wallet"]));
    assert_eq!(wallet["coins"], 0);
}

#[test]
fn test_short_delay_reward_flow() {
    let home = tempfile::tempdir().unwrap();
    run_ok(home.path(), &["config", "set", "rewards.delay_seconds", "1"]);
    run_ok(home.path(), &["subject", "add", "Math"]);
    let task = json_tail(&run_ok(home.path(), &["task", "add", "Read", "--subject", "Math"]));
    let id = task["id"].as_str().unwrap().to_string();

    run_ok(home.path(), &["task", "complete", &id]);
    std::thread::sleep(std::time::Duration::from_millis(1100));
    let stdout = run_ok(home.path(), &["task", "collect", &id]);
    assert!(stdout.starts_with("Rewards Collected! +5 coins, +5 XP"));
    let outcome = json_tail(&stdout);
    assert_eq!(outcome["balance"], 5);

    let stats = json_tail(&run_ok(home.path(), &["subject", "stats", "Math"]));
    assert_eq!(stats["totalExperience"], 5);
    assert_eq!(stats["level"], 1);
}

#[test]
fn test_unknown_task_fails() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["task", "delete", "task-missing"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Task not found: task-missing"));
}

#[test]
fn test_config_get_set_reset() {
    let home = tempfile::tempdir().unwrap();
    assert_eq!(
        run_ok(home.path(), &["config", "get", "rewards.delay_seconds"]).trim(),
        "43200"
    );
    run_ok(home.path(), &["config", "set", "review.first_interval_days", "3"]);
    assert_eq!(
        run_ok(home.path(), &["config", "get", "review.first_interval_days"]).trim(),
        "3"
    );

    let (_, _, code) = run_cli(home.path(), &["config", "set", "rewards.delay_seconds", "0"]);
    assert_eq!(code, 1);

    run_ok(home.path(), &["config", "reset"]);
    let list = run_ok(home.path(), &["config", "list"]);
    assert!(list.contains("review.first_interval_days = 7"));
}
