//! The `run` command: pre-check, distribute, watch, score, report.

use anyhow::{bail, Result};
use clap::Args;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use vibebench_core::BenchConfig;
use vibebench_score::{calculate_scores, winner, HeuristicAnalyzer, ScoreConfig, TargetAnalysis};
use vibebench_watch::{distribute, BenchmarkWatcher};

use crate::{dashboard, logging, precheck, report};

const DASHBOARD_REFRESH: Duration = Duration::from_secs(5);

/// Run benchmark arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Prompt text distributed to every target
    pub prompt: String,

    /// Path to the benchmark configuration file
    #[arg(long, default_value = "vibebench.toml")]
    pub config: PathBuf,

    /// Keep files from earlier runs in the target directories
    #[arg(long)]
    pub no_clean: bool,

    /// Watch timeout in seconds (overrides the configured value)
    #[arg(long)]
    pub timeout: Option<u64>,
}

pub async fn run(args: RunArgs, verbose: bool) -> Result<()> {
    let mut config = BenchConfig::load(&args.config)?;
    if let Some(secs) = args.timeout {
        config.watch_timeout = Duration::from_secs(secs);
    }

    let log_file = logging::init(&config.logs_dir, verbose)?;
    info!(prompt = %args.prompt.chars().take(100).collect::<String>(), "benchmark starting");

    println!("vibebench — benchmarking {} target(s)", config.targets.len());
    println!(
        "protocol: create {} to end thinking, save a code file to end writing",
        config.signal_file
    );
    println!();

    // Pre-check: fail before distributing anything.
    let checks = precheck::run_pre_checks(&config);
    for check in &checks {
        match &check.error {
            None => println!("  ok   {} — {}", check.name, check.path.display()),
            Some(err) => println!("  FAIL {} — {err}", check.name),
        }
    }
    if !precheck::all_ok(&checks) {
        bail!("target directory pre-check failed");
    }
    println!();

    // Distribution fixes the shared run clock.
    let dist = distribute(&config, &args.prompt, !args.no_clean)?;
    for outcome in &dist.outcomes {
        match &outcome.error {
            None => println!("  ok   {} — {} distributed", outcome.name, config.prompt_file),
            Some(err) => println!("  FAIL {} — {err}", outcome.name),
        }
    }
    if !dist.all_ok() {
        bail!("prompt distribution failed");
    }
    println!();
    info!(run_id = %dist.run_id, "prompt distributed, watching");

    let config = Arc::new(config);
    let mut watcher = BenchmarkWatcher::start(Arc::clone(&config), dist.clock)?;

    println!(
        "watching (timeout {}s, Ctrl+C to stop early)...",
        config.watch_timeout.as_secs()
    );
    let mut interrupted = false;
    loop {
        let remaining = config.watch_timeout.saturating_sub(dist.clock.elapsed());
        if remaining.is_zero() {
            warn!("watch timeout reached");
            break;
        }
        let slice = remaining.min(DASHBOARD_REFRESH);
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("watch interrupted by user");
                interrupted = true;
                break;
            }
            done = watcher.wait(slice) => {
                if done {
                    break;
                }
            }
        }
        println!("{}", dashboard::live_table(watcher.handlers()));
    }
    watcher.stop().await;

    if interrupted {
        println!("\nwatch stopped early; scoring what completed so far");
    }

    // Static analysis and scoring over whatever each tool produced.
    let analyzer = HeuristicAnalyzer::new(config.watched_extensions.clone());
    let results = watcher.results();
    let analyses: BTreeMap<String, TargetAnalysis> = results
        .iter()
        .map(|r| (r.name.clone(), analyzer.analyze_target(&r.dir)))
        .collect();
    let records = calculate_scores(&results, &analyses, &ScoreConfig::default());

    let report_path = report::save_final_report(&config.logs_dir, &records, &args.prompt, &log_file)?;

    println!();
    println!("{}", dashboard::score_table(&records));
    if let Some(best) = winner(&records) {
        info!(tool = %best.name, score = best.total_score, "winner");
        println!(
            "\nwinner: {} (score {:.1}, time {})",
            best.name,
            best.total_score,
            best.execution_time
                .map(|t| format!("{t:.3}s"))
                .unwrap_or_else(|| "-".to_string())
        );
    }
    println!("report: {}", report_path.display());
    println!("log:    {}", log_file.display());
    Ok(())
}
