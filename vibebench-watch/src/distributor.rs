//! Prompt distribution into target directories.

use crate::{StatusSnapshot, WatchError};
use std::fs;
use std::path::Path;
use vibebench_core::{BenchConfig, RunClock, RunId};

/// Outcome of distributing the prompt to one target.
#[derive(Debug, Clone)]
pub struct TargetDistribution {
    pub name: String,
    pub ok: bool,
    pub error: Option<String>,
}

/// Result of one distribution pass: the shared run clock plus per-target
/// outcomes in configuration order.
#[derive(Debug, Clone)]
pub struct Distribution {
    pub run_id: RunId,
    pub clock: RunClock,
    pub outcomes: Vec<TargetDistribution>,
}

impl Distribution {
    pub fn all_ok(&self) -> bool {
        self.outcomes.iter().all(|o| o.ok)
    }
}

/// Write the prompt file and a pending status snapshot into every target
/// directory, optionally cleaning stale source files first.
///
/// Per-target failures are recorded in the outcome (and logged) rather than
/// aborting the pass; the caller decides whether a partial distribution is
/// acceptable. An empty target list is a run-level fatal error.
pub fn distribute(
    config: &BenchConfig,
    prompt: &str,
    clean: bool,
) -> Result<Distribution, WatchError> {
    if config.targets.is_empty() {
        return Err(WatchError::NoTargets);
    }

    let run_id = RunId::new();
    let clock = RunClock::now();
    let mut outcomes = Vec::with_capacity(config.targets.len());

    for target in &config.targets {
        let result = distribute_one(config, &target.dir, &target.name, prompt, clean, &clock);
        let outcome = match result {
            Ok(()) => {
                tracing::info!(tool = %target.name, "prompt distributed");
                TargetDistribution {
                    name: target.name.clone(),
                    ok: true,
                    error: None,
                }
            }
            Err(err) => {
                tracing::error!(tool = %target.name, %err, "distribution failed");
                TargetDistribution {
                    name: target.name.clone(),
                    ok: false,
                    error: Some(err.to_string()),
                }
            }
        };
        outcomes.push(outcome);
    }

    Ok(Distribution {
        run_id,
        clock,
        outcomes,
    })
}

fn distribute_one(
    config: &BenchConfig,
    dir: &Path,
    tool: &str,
    prompt: &str,
    clean: bool,
    clock: &RunClock,
) -> Result<(), WatchError> {
    fs::create_dir_all(dir)?;

    if clean {
        let removed = clean_source_files(config, dir)?;
        if removed > 0 {
            tracing::info!(tool = %tool, removed, "stale source files removed");
        }
    }

    fs::write(dir.join(&config.prompt_file), prompt)?;

    let pending = StatusSnapshot::pending(tool, clock.started_wall);
    let json = serde_json::to_string_pretty(&pending)?;
    fs::write(dir.join(&config.status_file), json)?;

    Ok(())
}

/// Delete top-level files whose extension is in the watched set, so leftover
/// artifacts from a previous run cannot complete the new one instantly.
fn clean_source_files(config: &BenchConfig, dir: &Path) -> std::io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && config.is_watched(&path) {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) => {
                    tracing::warn!(path = %path.display(), %err, "could not remove stale file");
                }
            }
        }
    }
    Ok(removed)
}
