#![cfg(feature = "cli")]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::{Context, Result};
use balancebook::models::DailyPerformanceRow;
use balancebook::storage::{JsonFileStorage, Storage};
use tempfile::TempDir;

mod support;
use support::date;

fn write_config(dir: &Path) -> Result<PathBuf> {
    let config_path = dir.join("balancebook.toml");
    let content = r#"data_dir = "data"

[ingest]
retry_backoff = "0ms"
"#;
    std::fs::write(&config_path, content).context("Failed to write config")?;
    Ok(config_path)
}

fn run(config_path: &Path, args: &[&str]) -> Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_balancebook"))
        .args(["--config", config_path.to_str().unwrap()])
        .args(args)
        .output()
        .context("Failed to execute balancebook")
}

fn run_json(config_path: &Path, args: &[&str]) -> Result<serde_json::Value> {
    let output = run(config_path, args)?;
    if !output.status.success() {
        anyhow::bail!("balancebook {args:?} failed: {output:?}");
    }
    let stdout = String::from_utf8(output.stdout).context("stdout not UTF-8")?;
    serde_json::from_str(&stdout).context("output was not valid JSON")
}

#[test]
fn config_reports_resolved_data_dir() -> Result<()> {
    let dir = TempDir::new()?;
    let config_path = write_config(dir.path())?;

    let value = run_json(&config_path, &["config"])?;

    let data_dir = value["data_directory"].as_str().unwrap();
    assert!(data_dir.ends_with("data"), "{data_dir}");
    assert_eq!(value["ingest"]["lookback"], "5d");
    assert_eq!(value["ingest"]["batch_size"], 20);
    Ok(())
}

#[test]
fn recompute_without_events_exits_with_error() -> Result<()> {
    let dir = TempDir::new()?;
    let config_path = write_config(dir.path())?;

    let output = run(&config_path, &["recompute"])?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no account events"), "{stderr}");
    Ok(())
}

#[test]
fn summary_on_empty_store_reports_no_data() -> Result<()> {
    let dir = TempDir::new()?;
    let config_path = write_config(dir.path())?;

    let value = run_json(&config_path, &["summary", "--period", "all"])?;
    assert_eq!(value["error"], "No data available");

    let output = run(&config_path, &["summary", "--period", "2w"])?;
    assert!(!output.status.success());
    Ok(())
}

#[tokio::test]
async fn event_add_recomputes_and_summary_reflects_it() -> Result<()> {
    let dir = TempDir::new()?;
    let config_path = write_config(dir.path())?;

    let storage = JsonFileStorage::new(dir.path().join("data"));
    storage
        .upsert_rows(&[
            DailyPerformanceRow::with_growth(date("2024-01-01"), 0.0).with_end_balance(9_000.0),
            DailyPerformanceRow::with_growth(date("2024-01-02"), 10.0).with_end_balance(9_900.0),
            DailyPerformanceRow::with_growth(date("2024-01-03"), -5.0).with_end_balance(9_405.0),
        ])
        .await?;

    let added = run_json(
        &config_path,
        &[
            "event", "add", "--date", "2024-01-01", "--type", "CONTRIBUTION", "--amount", "1000",
        ],
    )?;
    assert_eq!(added["success"], true);
    assert_eq!(added["event"]["type"], "CONTRIBUTION");
    assert_eq!(added["recompute"]["rows"], 3);

    let rows = run_json(&config_path, &["rows", "list", "--start", "2024-01-02"])?;
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    let latest = rows[1]["personal_balance"].as_f64().unwrap();
    assert!((latest - 1045.0).abs() < 1e-6);

    let summary = run_json(&config_path, &["summary", "--period", "all"])?;
    assert!((summary["current_balance"].as_f64().unwrap() - 1045.0).abs() < 1e-6);
    assert!((summary["period_change_usd"].as_f64().unwrap() - 45.0).abs() < 1e-6);
    assert!((summary["period_change_pct"].as_f64().unwrap() - 4.5).abs() < 1e-6);
    assert_eq!(summary["fund_balance"], 9_405.0);
    assert_eq!(summary["as_of"], "2024-01-03");

    let events = run_json(&config_path, &["event", "list"])?;
    assert_eq!(events.as_array().unwrap().len(), 1);

    let output = run(
        &config_path,
        &["event", "add", "--date", "2024-01-02", "--type", "REFUND", "--amount", "5"],
    )?;
    assert!(!output.status.success());
    Ok(())
}
