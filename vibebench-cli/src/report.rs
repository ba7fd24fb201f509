//! Final JSON report written under the logs directory.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use vibebench_score::{winner, ScoreRecord, ScoreWeights};

const PROMPT_SNIPPET_CHARS: usize = 500;

#[derive(Serialize)]
struct FinalReport<'a> {
    timestamp: String,
    version: &'static str,
    prompt: String,
    log_file: String,
    weights: ScoreWeights,
    winner: Option<String>,
    results: &'a [ScoreRecord],
}

/// Persist the scored run as `report_YYYYMMDD_HHMMSS.json` and return the
/// path.
pub fn save_final_report(
    logs_dir: &Path,
    records: &[ScoreRecord],
    prompt: &str,
    log_file: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(logs_dir)?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let path = logs_dir.join(format!("report_{timestamp}.json"));

    let report = FinalReport {
        timestamp,
        version: env!("CARGO_PKG_VERSION"),
        prompt: prompt.chars().take(PROMPT_SNIPPET_CHARS).collect(),
        log_file: log_file.display().to_string(),
        weights: ScoreWeights::default(),
        winner: winner(records).map(|r| r.name.clone()),
        results: records,
    };

    let json = serde_json::to_string_pretty(&report)?;
    fs::write(&path, json).with_context(|| format!("writing report {}", path.display()))?;
    tracing::info!(path = %path.display(), "final report saved");
    Ok(path)
}

/// Most recent `report_*.json` under the logs directory, by filename.
pub fn latest_report(logs_dir: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(logs_dir).ok()?;
    entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("report_") && n.ends_with(".json"))
                .unwrap_or(false)
        })
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_is_written_and_found_as_latest() {
        let tmp = tempfile::tempdir().unwrap();
        let logs = tmp.path().join("logs");

        let path =
            save_final_report(&logs, &[], "build a calculator", Path::new("logs/x.log")).unwrap();
        assert!(path.exists());

        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["prompt"], "build a calculator");
        assert_eq!(parsed["weights"]["speed"], 0.3);
        assert!(parsed["winner"].is_null());

        assert_eq!(latest_report(&logs), Some(path));
    }

    #[test]
    fn latest_report_ignores_other_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("vibebench_20260101_000000.log"), "").unwrap();
        fs::write(tmp.path().join("report_20260101_000000.json"), "{}").unwrap();
        fs::write(tmp.path().join("report_20260201_000000.json"), "{}").unwrap();

        let latest = latest_report(tmp.path()).unwrap();
        assert!(latest.ends_with("report_20260201_000000.json"));
    }

    #[test]
    fn missing_logs_dir_has_no_latest() {
        assert!(latest_report(Path::new("/nonexistent/logs")).is_none());
    }

    #[test]
    fn long_prompts_are_truncated() {
        let tmp = tempfile::tempdir().unwrap();
        let prompt = "x".repeat(2000);
        let path = save_final_report(tmp.path(), &[], &prompt, Path::new("a.log")).unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["prompt"].as_str().unwrap().len(), 500);
    }
}
