//! The `status` command: read per-target snapshots without disturbing a run.

use anyhow::Result;
use clap::Args;
use std::fs;
use std::path::PathBuf;
use vibebench_core::BenchConfig;
use vibebench_watch::StatusSnapshot;

use crate::{logging, report};

/// Status arguments
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Path to the benchmark configuration file
    #[arg(long, default_value = "vibebench.toml")]
    pub config: PathBuf,
}

pub fn run(args: StatusArgs, verbose: bool) -> Result<()> {
    logging::init_console(verbose);
    let config = BenchConfig::load(&args.config)?;

    for target in &config.targets {
        let status_path = target.dir.join(&config.status_file);
        if !status_path.is_file() {
            println!("  {}: no data yet", target.name);
            continue;
        }
        match read_snapshot(&status_path) {
            Ok(snapshot) => {
                let time = snapshot
                    .total_time
                    .map(|t| format!("{t:.3}s"))
                    .unwrap_or_else(|| "-".to_string());
                let files = if snapshot.detected_files.is_empty() {
                    "-".to_string()
                } else {
                    snapshot.detected_files.join(", ")
                };
                let telemetry = snapshot
                    .telemetry
                    .map(|t| format!(" | retries: {} | errors: {}", t.retries, t.errors))
                    .unwrap_or_default();
                println!(
                    "  {}: {} | time: {time} | files: {files}{telemetry}",
                    target.name, snapshot.status
                );
            }
            Err(err) => {
                tracing::debug!(path = %status_path.display(), %err, "unreadable status file");
                println!("  {}: unreadable status file ({err})", target.name);
            }
        }
    }

    if let Some(latest) = report::latest_report(&config.logs_dir) {
        println!("\n  latest report: {}", latest.display());
    }
    Ok(())
}

fn read_snapshot(path: &std::path::Path) -> Result<StatusSnapshot> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
