use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn rapport() -> Command {
    let mut cmd = Command::cargo_bin("rapport").expect("binary built");
    cmd.env_remove("DATABASE_URL").env_remove("RUST_LOG");
    cmd
}

#[test]
fn session_id_prints_single_chat_identifier() {
    rapport()
        .args(["session-id", "0", "1", "2"])
        .assert()
        .success()
        .stdout("000|0000000000000000000100000000000000000002\n");
}

#[test]
fn session_id_for_unknown_kind_is_empty() {
    rapport()
        .args(["session-id", "-1", "1", "2"])
        .assert()
        .success()
        .stdout("\n");
}

#[test]
fn migrate_creates_the_database() {
    let dir = tempfile::tempdir().expect("temp dir");
    let db_path = dir.path().join("social.db");
    let config_path = dir.path().join("config.toml");
    fs::write(
        &config_path,
        format!("[database]\npath = \"{}\"\n", db_path.display()),
    )
    .expect("write config");

    rapport()
        .args(["migrate", "--config"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"));

    assert!(db_path.exists());
}

#[test]
fn invalid_config_exits_nonzero() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[repair]\nmax_attempts = 0\n").expect("write config");

    rapport()
        .args(["migrate", "--config"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("repair.max_attempts"));
}
