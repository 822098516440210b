//! Integration tests for the qw binary
//!
//! `qw watch` runs until Ctrl-C, so only its startup failures are driven
//! here; the watching itself is covered by the watcher crate's tests.

mod common;

use anyhow::Result;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_config_example_is_valid_toml() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let result = qw!(temp_dir.path(), "config", "example").assert_success()?;
    assert!(result.contains_stdout("interval_ms = 100"));
    assert!(result.contains_stdout("filter = \"*\""));

    // The example must pass its own check
    let file = temp_dir.path().join("example.toml");
    fs::write(&file, &result.stdout)?;
    let check = qw!(temp_dir.path(), "config", "check", "example.toml").assert_success()?;
    assert!(check.contains_stdout("is valid"));

    Ok(())
}

#[test]
fn test_config_check_reports_values() -> Result<()> {
    let temp_dir = TempDir::new()?;
    fs::write(
        temp_dir.path().join("qw.toml"),
        "path = \"/srv/data\"\nfilter = \"*.csv\"\ninterval_ms = 500\nprune_idle_secs = 600\n",
    )?;

    let result = qw!(temp_dir.path(), "config", "check", "qw.toml").assert_success()?;
    assert!(result.contains_stdout("/srv/data"));
    assert!(result.contains_stdout("\"*.csv\""));
    assert!(result.contains_stdout("500"));
    assert!(result.contains_stdout("600"));

    Ok(())
}

#[test]
fn test_config_check_rejects_out_of_range_interval() -> Result<()> {
    let temp_dir = TempDir::new()?;
    fs::write(
        temp_dir.path().join("bad.toml"),
        "path = \".\"\ninterval_ms = 120000\n",
    )?;

    let result = qw!(temp_dir.path(), "config", "check", "bad.toml").assert_failure()?;
    assert!(result.contains_stderr("out of range"));

    Ok(())
}

#[test]
fn test_config_check_rejects_unknown_key() -> Result<()> {
    let temp_dir = TempDir::new()?;
    fs::write(
        temp_dir.path().join("typo.toml"),
        "path = \".\"\nintervall_ms = 10\n",
    )?;

    let result = qw!(temp_dir.path(), "config", "check", "typo.toml").assert_failure()?;
    assert!(result.contains_stderr("intervall_ms"));

    Ok(())
}

#[test]
fn test_config_check_rejects_bad_glob() -> Result<()> {
    let temp_dir = TempDir::new()?;
    fs::write(
        temp_dir.path().join("glob.toml"),
        "path = \".\"\nfilter = \"src/*.rs\"\n",
    )?;

    let result = qw!(temp_dir.path(), "config", "check", "glob.toml").assert_failure()?;
    assert!(result.contains_stderr("invalid filter pattern"));

    Ok(())
}

#[test]
fn test_config_check_missing_file() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let result = qw!(temp_dir.path(), "config", "check", "nope.toml").assert_failure()?;
    assert!(result.contains_stderr("nope.toml"));

    Ok(())
}

#[test]
fn test_config_path_honors_override() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let custom = temp_dir.path().join("custom-dir");

    let result = qw!(temp_dir.path(), "config", "path")
        .env("QW_CONFIG_DIR", &custom.display().to_string())
        .assert_success()?;
    assert!(result.contains_stdout(&custom.join("config.toml").display().to_string()));
    assert!(result.contains_stdout("not found"));

    Ok(())
}

#[test]
fn test_watch_missing_directory_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let result = qw!(temp_dir.path(), "watch", "does-not-exist").assert_failure()?;
    assert!(result.contains_stderr("does not exist"));

    Ok(())
}

#[test]
fn test_watch_without_path_fails() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let result = qw!(temp_dir.path(), "watch").assert_failure()?;
    assert!(result.contains_stderr("watch path is empty"));

    Ok(())
}

#[test]
fn test_watch_rejects_empty_filter() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let result = qw!(temp_dir.path(), "watch", ".", "--filter", "").assert_failure()?;
    assert!(result.contains_stderr("filter pattern is empty"));

    Ok(())
}

#[test]
fn test_watch_rejects_large_interval() -> Result<()> {
    let temp_dir = TempDir::new()?;

    let result =
        qw!(temp_dir.path(), "watch", ".", "--interval-ms", "600000").assert_failure()?;
    assert!(result.contains_stderr("out of range"));

    Ok(())
}

#[test]
fn test_watch_uses_user_config_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_dir = temp_dir.path().join(".qw-config");
    fs::create_dir_all(&config_dir)?;
    fs::write(
        config_dir.join("config.toml"),
        "path = \"missing-from-config\"\n",
    )?;

    let result = qw!(temp_dir.path(), "watch").assert_failure()?;
    assert!(result.contains_stderr("missing-from-config"));

    Ok(())
}
