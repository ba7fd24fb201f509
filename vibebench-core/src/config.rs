//! Benchmark run configuration.
//!
//! Loaded from a TOML file through [`RawBenchConfig`] (everything optional)
//! and finalized into an immutable [`BenchConfig`] with defaults applied.

use crate::{ConfigError, Target};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prompt file written into each target directory by the distributor.
pub const DEFAULT_PROMPT_FILE: &str = "task_input.txt";
/// Per-target status snapshot maintained by the watcher.
pub const DEFAULT_STATUS_FILE: &str = "status.json";
/// Marker file whose creation ends the thinking phase.
pub const DEFAULT_SIGNAL_FILE: &str = "start_signal.json";

const DEFAULT_WATCH_TIMEOUT_SECS: u64 = 600;
const DEFAULT_RAPID_SAVE_WINDOW_SECS: f64 = 2.0;
const DEFAULT_SAMPLE_INTERVAL_SECS: f64 = 1.0;

fn default_extensions() -> BTreeSet<String> {
    [
        "py", "js", "ts", "tsx", "jsx", "html", "css", "java", "cpp", "c", "go", "rs", "rb",
        "php", "swift",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Immutable configuration for one benchmark run.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Benchmark participants, in declaration order. This order is also the
    /// ranking tie-break.
    pub targets: Vec<Target>,
    /// Basename of the distributed prompt file.
    pub prompt_file: String,
    /// Basename of the per-target status snapshot.
    pub status_file: String,
    /// Basename of the start-signal marker file.
    pub signal_file: String,
    /// Lowercase extensions (without dots) that count as code artifacts.
    pub watched_extensions: BTreeSet<String>,
    /// Wall-clock deadline for the whole run.
    pub watch_timeout: Duration,
    /// Two saves of the same file closer than this count as one error.
    pub rapid_save_window: Duration,
    /// Resource sampling cadence.
    pub sample_interval: Duration,
    /// Directory for log files and JSON reports.
    pub logs_dir: PathBuf,
}

impl BenchConfig {
    /// Load configuration from a TOML file and validate it.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawBenchConfig = toml::from_str(&contents)?;
        Self::finalize(raw)
    }

    /// Apply defaults to a raw config and validate the result.
    pub fn finalize(raw: RawBenchConfig) -> Result<Self, ConfigError> {
        let targets: Vec<Target> = raw
            .targets
            .into_iter()
            .map(|t| Target::new(t.name, t.dir))
            .collect();

        if targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        let mut seen = BTreeSet::new();
        for target in &targets {
            if !seen.insert(target.name.clone()) {
                return Err(ConfigError::DuplicateTarget(target.name.clone()));
            }
        }

        let watched_extensions = match raw.watched_extensions {
            Some(exts) => exts
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            None => default_extensions(),
        };

        Ok(Self {
            targets,
            prompt_file: raw
                .prompt_file
                .unwrap_or_else(|| DEFAULT_PROMPT_FILE.to_string()),
            status_file: raw
                .status_file
                .unwrap_or_else(|| DEFAULT_STATUS_FILE.to_string()),
            signal_file: raw
                .signal_file
                .unwrap_or_else(|| DEFAULT_SIGNAL_FILE.to_string()),
            watched_extensions,
            watch_timeout: Duration::from_secs(
                raw.watch_timeout_secs.unwrap_or(DEFAULT_WATCH_TIMEOUT_SECS),
            ),
            rapid_save_window: Duration::from_secs_f64(
                raw.rapid_save_window_secs
                    .unwrap_or(DEFAULT_RAPID_SAVE_WINDOW_SECS),
            ),
            sample_interval: Duration::from_secs_f64(
                raw.sample_interval_secs
                    .unwrap_or(DEFAULT_SAMPLE_INTERVAL_SECS),
            ),
            logs_dir: raw.logs_dir.unwrap_or_else(|| PathBuf::from("logs")),
        })
    }

    /// Whether `path` has an extension in the watched set.
    pub fn is_watched(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.watched_extensions.contains(&e.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    /// Whether `basename` is one of the reserved control files
    /// (prompt input, status snapshot, start signal).
    pub fn is_reserved(&self, basename: &str) -> bool {
        basename == self.prompt_file || basename == self.status_file || basename == self.signal_file
    }

    /// Look up a target by name.
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }
}

/// TOML-facing configuration with every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawBenchConfig {
    #[serde(default)]
    pub targets: Vec<RawTarget>,
    pub prompt_file: Option<String>,
    pub status_file: Option<String>,
    pub signal_file: Option<String>,
    pub watched_extensions: Option<Vec<String>>,
    pub watch_timeout_secs: Option<u64>,
    pub rapid_save_window_secs: Option<f64>,
    pub sample_interval_secs: Option<f64>,
    pub logs_dir: Option<PathBuf>,
}

/// One `[[targets]]` entry in the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTarget {
    pub name: String,
    pub dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn raw_with_targets() -> RawBenchConfig {
        RawBenchConfig {
            targets: vec![
                RawTarget {
                    name: "Cursor".into(),
                    dir: "bench-cursor".into(),
                },
                RawTarget {
                    name: "Windsurf".into(),
                    dir: "bench-windsurf".into(),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn finalize_applies_defaults() {
        let config = BenchConfig::finalize(raw_with_targets()).unwrap();

        assert_eq!(config.prompt_file, "task_input.txt");
        assert_eq!(config.status_file, "status.json");
        assert_eq!(config.signal_file, "start_signal.json");
        assert_eq!(config.watch_timeout, Duration::from_secs(600));
        assert_eq!(config.rapid_save_window, Duration::from_secs(2));
        assert!(config.watched_extensions.contains("py"));
        assert!(config.watched_extensions.contains("rs"));
    }

    #[test]
    fn finalize_rejects_empty_target_list() {
        let result = BenchConfig::finalize(RawBenchConfig::default());
        assert!(matches!(result, Err(ConfigError::NoTargets)));
    }

    #[test]
    fn finalize_rejects_duplicate_target_names() {
        let mut raw = raw_with_targets();
        raw.targets.push(RawTarget {
            name: "Cursor".into(),
            dir: "elsewhere".into(),
        });
        let result = BenchConfig::finalize(raw);
        assert!(matches!(result, Err(ConfigError::DuplicateTarget(name)) if name == "Cursor"));
    }

    #[test]
    fn finalize_normalizes_extension_spelling() {
        let mut raw = raw_with_targets();
        raw.watched_extensions = Some(vec![".PY".into(), "Rs".into()]);
        let config = BenchConfig::finalize(raw).unwrap();

        assert!(config.is_watched(Path::new("a/solution.py")));
        assert!(config.is_watched(Path::new("lib.RS")));
        assert!(!config.is_watched(Path::new("notes.txt")));
    }

    #[test]
    fn is_watched_requires_an_extension() {
        let config = BenchConfig::finalize(raw_with_targets()).unwrap();
        assert!(!config.is_watched(Path::new("Makefile")));
    }

    #[test]
    fn is_reserved_matches_control_files_only() {
        let config = BenchConfig::finalize(raw_with_targets()).unwrap();
        assert!(config.is_reserved("task_input.txt"));
        assert!(config.is_reserved("status.json"));
        assert!(config.is_reserved("start_signal.json"));
        assert!(!config.is_reserved("main.py"));
    }

    #[test]
    fn load_reads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vibebench.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
watch_timeout_secs = 120
rapid_save_window_secs = 0.5

[[targets]]
name = "Cursor"
dir = "bench-cursor"
"#
        )
        .unwrap();

        let config = BenchConfig::load(&path).unwrap();
        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.watch_timeout, Duration::from_secs(120));
        assert_eq!(config.rapid_save_window, Duration::from_secs_f64(0.5));
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let result = BenchConfig::load(Path::new("/nonexistent/vibebench.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn target_lookup_by_name() {
        let config = BenchConfig::finalize(raw_with_targets()).unwrap();
        assert!(config.target("Windsurf").is_some());
        assert!(config.target("Nope").is_none());
    }
}
