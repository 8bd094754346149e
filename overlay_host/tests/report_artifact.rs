use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use serde_json::Value;
use tempfile::tempdir;

#[test]
fn revert_scenario_report_artifact() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory for the report")?;
    let report_path = temp_dir.path().join("revert_report.json");

    let binary = PathBuf::from(env!("CARGO_BIN_EXE_overlay_host"));
    let output = Command::new(&binary)
        .args([
            "--scenario",
            "revert",
            "--report-json",
            report_path.to_str().expect("utf-8 temp path"),
            "--max-ticks",
            "150",
        ])
        .output()
        .with_context(|| format!("running {}", binary.display()))?;

    assert!(
        output.status.success(),
        "harness failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let raw = fs::read_to_string(&report_path).context("reading the report artifact")?;
    let report: Value = serde_json::from_str(&raw).context("parsing the report artifact")?;

    assert_eq!(report["scenario"], "revert");
    assert_eq!(report["failsafe"], "reverted");
    assert_eq!(report["outcome"]["kind"], "halted");
    assert_eq!(report["outcome"]["condition"], "Modified script");

    let scripts = report["appended_scripts"]
        .as_array()
        .expect("appended_scripts array");
    assert!(scripts
        .iter()
        .any(|s| s.as_str().is_some_and(|s| s.ends_with("?ignore"))));

    let events = report["events"].as_array().expect("events array");
    assert!(!events.is_empty());

    Ok(())
}
