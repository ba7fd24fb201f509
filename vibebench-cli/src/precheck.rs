//! Write-permission probe run before distribution.

use std::fs;
use std::path::{Path, PathBuf};
use vibebench_core::BenchConfig;

const PROBE_FILE: &str = ".vibebench_write_test";

/// Outcome of probing one target directory.
#[derive(Debug)]
pub struct PrecheckResult {
    pub name: String,
    pub path: PathBuf,
    pub ok: bool,
    pub error: Option<String>,
}

/// Probe every target directory for write access.
///
/// Creates missing directories, then writes and removes a throwaway file so
/// permission problems surface before the run starts instead of mid-watch.
pub fn run_pre_checks(config: &BenchConfig) -> Vec<PrecheckResult> {
    config
        .targets
        .iter()
        .map(|target| match check_write(&target.dir) {
            Ok(()) => {
                tracing::info!(tool = %target.name, dir = %target.dir.display(), "write probe ok");
                PrecheckResult {
                    name: target.name.clone(),
                    path: target.dir.clone(),
                    ok: true,
                    error: None,
                }
            }
            Err(err) => {
                tracing::error!(tool = %target.name, %err, "write probe failed");
                PrecheckResult {
                    name: target.name.clone(),
                    path: target.dir.clone(),
                    ok: false,
                    error: Some(err.to_string()),
                }
            }
        })
        .collect()
}

pub fn all_ok(results: &[PrecheckResult]) -> bool {
    results.iter().all(|r| r.ok)
}

fn check_write(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let probe = dir.join(PROBE_FILE);
    fs::write(&probe, "write_permission_test")?;
    fs::remove_file(&probe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibebench_core::{RawBenchConfig, RawTarget};

    #[test]
    fn writable_directory_passes_and_leaves_no_probe() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("bench");
        let raw = RawBenchConfig {
            targets: vec![RawTarget {
                name: "Cursor".into(),
                dir: dir.clone(),
            }],
            ..Default::default()
        };
        let config = BenchConfig::finalize(raw).unwrap();

        let results = run_pre_checks(&config);
        assert!(all_ok(&results));
        assert!(!dir.join(PROBE_FILE).exists());
    }

    #[test]
    fn unwritable_directory_fails_with_a_message() {
        let raw = RawBenchConfig {
            targets: vec![RawTarget {
                name: "Bad".into(),
                dir: "/proc/vibebench-no-such-dir".into(),
            }],
            ..Default::default()
        };
        let config = BenchConfig::finalize(raw).unwrap();

        let results = run_pre_checks(&config);
        assert!(!all_ok(&results));
        assert!(results[0].error.is_some());
    }
}
