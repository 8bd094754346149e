use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use overlay_gate::Settings;

mod scenario;
use scenario::{Outcome, Scenario};

/// Scripted harness for the overlay readiness engine.
#[derive(Parser, Debug)]
#[command(
    about = "Replays a scripted page/host environment against the readiness gate",
    version
)]
struct Args {
    /// Scenario to replay: happy, revert, or wrong-version
    #[arg(long, default_value = "happy")]
    scenario: String,

    /// Optional JSON settings file overriding the built-in defaults
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Path to write the scenario report JSON
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Maximum simulated ticks before giving up
    #[arg(long, default_value_t = 200)]
    max_ticks: u64,

    /// Mirror the engine's event trace to stderr
    #[arg(long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let scenario = Scenario::parse(&args.scenario)?;
    let settings = Settings::from_json_file(args.settings.as_deref())?;

    let report = scenario::run(scenario, settings, args.max_ticks, args.verbose)?;

    match &report.outcome {
        Outcome::Ready { ticks } => {
            println!("[overlay_host] scenario '{}' armed the overlay after {ticks} ticks", report.scenario);
        }
        Outcome::Halted { condition, ticks } => {
            println!(
                "[overlay_host] scenario '{}' halted at tick {ticks} on condition '{condition}' (failsafe: {})",
                report.scenario, report.failsafe
            );
        }
        Outcome::TimedOut { ticks } => {
            eprintln!(
                "[overlay_host] warning: scenario '{}' did not settle within {ticks} ticks",
                report.scenario
            );
        }
    }
    println!(
        "[overlay_host] appended {} scripts, {} styles; {} toasts; {} trace events",
        report.appended_scripts.len(),
        report.appended_styles.len(),
        report.toasts.len(),
        report.events.len()
    );

    if let Some(path) = args.report_json.as_ref() {
        report.save_to_path(path)?;
        println!("Saved scenario report to {}", path.display());
    }

    Ok(())
}
