//! Integration tests for the migrator CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get the migrator binary, isolated from the caller's environment
#[allow(deprecated)]
fn migrator_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("migrator").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("MIGRATOR_PROVIDER")
        .env_remove("MIGRATOR_CONN")
        .env_remove("MIGRATOR_DIR")
        .env_remove("RUST_LOG");
    cmd
}

fn migration_files(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn test_help_command() {
    let dir = TempDir::new().unwrap();
    migrator_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: migrator"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("apply"))
        .stdout(predicate::str::contains("rollback"))
        .stdout(predicate::str::contains("redo"))
        .stdout(predicate::str::contains("create"));
}

#[test]
fn test_version_command() {
    let dir = TempDir::new().unwrap();
    migrator_cmd(&dir)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("Version"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_apply_help() {
    let dir = TempDir::new().unwrap();
    migrator_cmd(&dir)
        .args(["apply", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--target-version"));
}

#[test]
fn test_rollback_help() {
    let dir = TempDir::new().unwrap();
    migrator_cmd(&dir)
        .args(["rollback", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("all"))
        .stdout(predicate::str::contains("to"));
}

#[test]
fn test_create_writes_template() {
    let dir = TempDir::new().unwrap();
    migrator_cmd(&dir)
        .args([
            "create",
            "Add orders table",
            "--author",
            "dana",
            "--branch",
            "feature/orders",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created"));

    let migrations = dir.path().join("migrations");
    let files = migration_files(&migrations);
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("_add-orders-table.sql"), "{}", files[0]);

    let content = fs::read_to_string(migrations.join(&files[0])).unwrap();
    assert!(content.contains("-- Author: dana"));
    assert!(content.contains("-- Branch: feature/orders"));
    assert!(content.contains("-- Transaction: on"));
    assert!(content.contains("-- UP"));
    assert!(content.contains("-- DOWN"));
}

#[test]
fn test_create_no_transaction_in_custom_dir() {
    let dir = TempDir::new().unwrap();
    migrator_cmd(&dir)
        .args([
            "create",
            "concurrent index",
            "--no-transaction",
            "--author",
            "dana",
            "--migrations-dir",
            "db/sql",
        ])
        .assert()
        .success();

    let target = dir.path().join("db/sql");
    let files = migration_files(&target);
    assert_eq!(files.len(), 1);
    let content = fs::read_to_string(target.join(&files[0])).unwrap();
    assert!(content.contains("-- Transaction: off"));
}

#[test]
fn test_create_uses_config_file_author() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("migrator.toml"),
        "migrations_dir = \"schema\"\n\n[author]\nname = \"from-config\"\nbranch = \"main\"\n",
    )
    .unwrap();

    migrator_cmd(&dir)
        .args(["create", "seed data"])
        .assert()
        .success();

    let target = dir.path().join("schema");
    let files = migration_files(&target);
    let content = fs::read_to_string(target.join(&files[0])).unwrap();
    assert!(content.contains("-- Author: from-config"));
    assert!(content.contains("-- Branch: main"));
}

#[test]
fn test_create_rejects_empty_slug() {
    let dir = TempDir::new().unwrap();
    migrator_cmd(&dir)
        .args(["create", "!!!", "--author", "dana"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no usable characters"));
}

#[test]
fn test_status_without_provider_fails() {
    let dir = TempDir::new().unwrap();
    migrator_cmd(&dir)
        .arg("status")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no database provider configured"));
}

#[test]
fn test_status_without_connection_fails() {
    let dir = TempDir::new().unwrap();
    migrator_cmd(&dir)
        .args(["status", "--provider", "postgresql"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no connection string configured"));
}

#[test]
fn test_unknown_provider_fails() {
    let dir = TempDir::new().unwrap();
    migrator_cmd(&dir)
        .args(["apply", "--provider", "sqlite", "--conn", "file:app.db"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown provider 'sqlite'"));
}

#[test]
fn test_oracle_needs_registered_driver() {
    let dir = TempDir::new().unwrap();
    migrator_cmd(&dir)
        .args(["status", "--provider", "oracle", "--conn", "oracle://db/orcl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no driver registered for provider 'oracle'"));
}

#[test]
fn test_provider_from_environment() {
    let dir = TempDir::new().unwrap();
    migrator_cmd(&dir)
        .env("MIGRATOR_PROVIDER", "oracle")
        .env("MIGRATOR_CONN", "oracle://db/orcl")
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("provider 'oracle'"));
}

#[test]
fn test_invalid_config_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("migrator.toml"), "provider = [").unwrap();
    migrator_cmd(&dir)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse migrator.toml"));
}

#[test]
fn test_apply_to_and_version_conflict() {
    let dir = TempDir::new().unwrap();
    migrator_cmd(&dir)
        .args(["apply", "-v", "a", "to", "b"])
        .assert()
        .failure();
}
