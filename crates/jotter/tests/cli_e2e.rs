#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Nothing listens here; connections are refused right away.
const DEAD_API: &str = "http://127.0.0.1:9/api";

const SAVED_SESSION: &str = r#"{
  "token": "tok-1",
  "user": {
    "id": "u1",
    "firstname": "Ada",
    "lastname": "Lovelace",
    "email": "ada@example.com",
    "autosave": true
  }
}"#;

fn jotter_cmd(temp: &TempDir) -> Command {
    let mut cmd = Command::new(cargo_bin("jotter"));
    cmd.env("JOTTER_DATA_DIR", temp.path())
        .env("JOTTER_CONFIG", temp.path().join("jotter.toml"))
        .env("JOTTER_API_URL", DEAD_API)
        .env("JOTTER_REQUEST_TIMEOUT_SECS", "2")
        .env_remove("JOTTER_LOG")
        .env_remove("RUST_LOG")
        .env_remove("JOTTER_PASSWORD")
        .env_remove("JOTTER_NEW_PASSWORD")
        .env_remove("JOTTER_CONFIRM_PASSWORD");
    cmd
}

fn session_path(temp: &TempDir) -> std::path::PathBuf {
    temp.path().join("session.json")
}

fn save_session(path: &Path) {
    fs::write(path, SAVED_SESSION).unwrap();
}

#[test]
fn help_lists_the_command_groups() {
    let temp = TempDir::new().unwrap();
    jotter_cmd(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("notes"))
        .stdout(predicate::str::contains("todos"))
        .stdout(predicate::str::contains("tasks"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("home"))
        .stdout(predicate::str::contains("account"));
}

#[test]
fn listing_without_a_session_asks_for_login() {
    let temp = TempDir::new().unwrap();
    jotter_cmd(&temp)
        .args(["notes", "list"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Not logged in"))
        .stderr(predicate::str::contains("jotter login"));
    assert!(!session_path(&temp).exists());
}

#[test]
fn unreadable_session_counts_as_logged_out() {
    let temp = TempDir::new().unwrap();
    fs::write(session_path(&temp), "{oops").unwrap();

    jotter_cmd(&temp)
        .args(["todos", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
    assert!(!session_path(&temp).exists());
}

#[test]
fn unreachable_service_is_a_network_error() {
    let temp = TempDir::new().unwrap();
    jotter_cmd(&temp)
        .env("JOTTER_PASSWORD", "secret")
        .args(["login", "ada@example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Network error"))
        .stderr(predicate::str::contains("jotter login").not());
    assert!(!session_path(&temp).exists());
}

#[test]
fn network_failure_keeps_the_saved_session() {
    let temp = TempDir::new().unwrap();
    save_session(&session_path(&temp));

    jotter_cmd(&temp)
        .args(["notes", "list", "--archived"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Network error"));
    assert!(session_path(&temp).exists());
}

#[test]
fn logout_removes_the_saved_session() {
    let temp = TempDir::new().unwrap();
    save_session(&session_path(&temp));

    jotter_cmd(&temp)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out successfully"));
    assert!(!session_path(&temp).exists());
}

#[test]
fn note_flags_are_rejected_for_todos() {
    let temp = TempDir::new().unwrap();
    save_session(&session_path(&temp));

    jotter_cmd(&temp)
        .args(["todos", "create", "--content", "body", "Groceries"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--content only applies to notes"));
}

#[test]
fn edit_needs_something_to_change() {
    let temp = TempDir::new().unwrap();
    save_session(&session_path(&temp));

    jotter_cmd(&temp)
        .args(["notes", "edit", "n1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to change"));
}

#[test]
fn completions_print_a_script() {
    let temp = TempDir::new().unwrap();
    jotter_cmd(&temp)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("jotter"));
}

#[test]
fn home_needs_the_service() {
    let temp = TempDir::new().unwrap();
    save_session(&session_path(&temp));

    jotter_cmd(&temp)
        .args(["home", "--notes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Network error"));
    assert!(session_path(&temp).exists());
}

#[test]
fn password_confirmation_is_checked_before_sending() {
    let temp = TempDir::new().unwrap();
    save_session(&session_path(&temp));

    jotter_cmd(&temp)
        .args(["account", "password", "--old", "secret1", "--new", "abcdef"])
        .env("JOTTER_CONFIRM_PASSWORD", "abcdeg")
        .assert()
        .failure()
        .stderr(predicate::str::contains("New password and confirmation do not match."))
        .stderr(predicate::str::contains("Network error").not());
    assert!(session_path(&temp).exists());
}

#[test]
fn account_deletion_needs_confirmation() {
    let temp = TempDir::new().unwrap();
    save_session(&session_path(&temp));

    jotter_cmd(&temp)
        .args(["account", "delete"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));
    assert!(session_path(&temp).exists());
}
