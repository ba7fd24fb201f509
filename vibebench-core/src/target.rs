//! Benchmark participants.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One benchmarked tool: a stable name plus the directory it owns exclusively
/// for the duration of a run.
///
/// Targets are created from configuration before the run starts and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Display name of the tool (e.g. "Cursor").
    pub name: String,
    /// Absolute or config-relative directory watched for this tool.
    pub dir: PathBuf,
}

impl Target {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
        }
    }
}
