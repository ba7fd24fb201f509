//! Error types for vibebench-core.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading and validation errors.
///
/// These are run-level setup faults: they abort the run before anything is
/// distributed or watched.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no benchmark targets configured")]
    NoTargets,

    #[error("duplicate target name: {0}")]
    DuplicateTarget(String),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}
