use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const INVOICE: &str = "\
Acme Supplies Ltd
Invoice #INV-1001
Date: 2024-01-15

Description        Qty    Unit Price    Amount
Widget               2        100.00    200.00
Shipping             1         45.00     45.00

Total: $245.00
";

/// `invex` isolated from the user's config, .env and credentials.
fn invex(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("invex").unwrap();
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join("config-home"))
        .env("HOME", dir)
        .env_remove("GEMINI_API_KEY")
        .env_remove("GOOGLE_API_KEY");
    cmd
}

#[test]
fn test_process_text_invoice() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("invoice.txt"), INVOICE).unwrap();

    invex(dir.path())
        .args(["process", "invoice.txt", "--no-llm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Extracted 2 items from invoice.txt"));

    let csv = fs::read_to_string(dir.path().join("invoice.csv")).unwrap();
    let mut lines = csv.lines();
    assert!(lines.next().unwrap().starts_with("invoice_number,date,vendor,description"));
    assert!(csv.contains("INV-1001"));
    assert_eq!(csv.lines().count(), 3);

    let json = fs::read_to_string(dir.path().join("invoice.json")).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["total"], "245.00");
}

#[test]
fn test_process_no_json() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("invoice.txt"), INVOICE).unwrap();

    invex(dir.path())
        .args(["process", "invoice.txt", "--no-json", "-o", "out"])
        .assert()
        .success();

    assert!(dir.path().join("out/invoice.csv").exists());
    assert!(!dir.path().join("out/invoice.json").exists());
}

#[test]
fn test_process_empty_extraction_exits_zero() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.txt"), "nothing useful here\n").unwrap();

    invex(dir.path())
        .args(["process", "notes.txt", "--no-llm"])
        .assert()
        .success();

    let csv = fs::read_to_string(dir.path().join("notes.csv")).unwrap();
    assert_eq!(csv.lines().count(), 2);
}

#[test]
fn test_process_missing_file() {
    let dir = TempDir::new().unwrap();

    invex(dir.path())
        .args(["process", "missing.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("file not found"));

    assert!(!dir.path().join("missing.csv").exists());
}

#[test]
fn test_process_unsupported_format() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("photo.png"), b"\x89PNG\r\n\x1a\n").unwrap();

    invex(dir.path())
        .args(["process", "photo.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported format"));
}

#[test]
fn test_batch_continues_past_failures() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), INVOICE).unwrap();
    fs::write(dir.path().join("b.pdf"), "not really a pdf").unwrap();

    invex(dir.path())
        .args(["batch", "*.*", "--no-llm", "--summary", "-o", "results"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 successful, 1 failed"));

    let summary = fs::read_to_string(dir.path().join("results/summary.csv")).unwrap();
    assert!(summary.starts_with("file,status,invoice_number"));
    assert!(summary.contains("a.txt,success,INV-1001"));
    assert!(summary.contains("b.pdf,error"));
    assert!(dir.path().join("results/a.csv").exists());
}

#[test]
fn test_config_init_set_get() {
    let dir = TempDir::new().unwrap();
    let cfg = dir.path().join("invex.json");
    let cfg = cfg.to_str().unwrap();

    invex(dir.path())
        .args(["-c", cfg, "config", "init"])
        .assert()
        .success();

    invex(dir.path())
        .args(["-c", cfg, "config", "set", "extraction.day_first", "false"])
        .assert()
        .success();

    invex(dir.path())
        .args(["-c", cfg, "config", "get", "extraction.day_first"])
        .assert()
        .success()
        .stdout(predicate::str::contains("false"));

    invex(dir.path())
        .args(["-c", cfg, "config", "set", "extraction.no_such_key", "1"])
        .assert()
        .failure();
}

#[test]
fn test_config_never_shows_api_key() {
    let dir = TempDir::new().unwrap();

    invex(dir.path())
        .env("GEMINI_API_KEY", "super-secret")
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("super-secret").not());
}
