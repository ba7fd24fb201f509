//! Logging setup: everything to a timestamped file, warnings to the console.

use anyhow::Result;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Install the run-mode subscriber: a debug-level file layer under
/// `logs_dir` plus a quieter console layer. Returns the log file path.
pub fn init(logs_dir: &Path, verbose: bool) -> Result<PathBuf> {
    std::fs::create_dir_all(logs_dir)?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_path = logs_dir.join(format!("vibebench_{timestamp}.log"));
    let file = File::create(&log_path)?;

    let console_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .with_filter(EnvFilter::new("debug")),
        )
        .with(fmt::layer().with_filter(EnvFilter::new(console_level)))
        .try_init()?;

    Ok(log_path)
}

/// Console-only subscriber for read-only commands.
pub fn init_console(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_logs_dir_and_file() {
        let tmp = tempfile::tempdir().unwrap();
        let logs = tmp.path().join("logs");

        let path = init(&logs, false).unwrap();
        assert!(path.exists());
        assert!(path
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("vibebench_"));
    }
}
