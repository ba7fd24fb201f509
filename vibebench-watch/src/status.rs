//! Per-target status snapshots persisted as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vibebench_telemetry::TelemetrySummary;

/// Lifecycle state of one target within a run.
///
/// `Pending → Completed` happens exactly once, on the first qualifying code
/// artifact; `Pending → Timeout` is applied externally when the run deadline
/// passes. Neither terminal state transitions further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Pending,
    Completed,
    Timeout,
}

impl std::fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionStatus::Pending => write!(f, "pending"),
            CompletionStatus::Completed => write!(f, "completed"),
            CompletionStatus::Timeout => write!(f, "timeout"),
        }
    }
}

/// The JSON document written into each target's status file.
///
/// The distributor writes the pending form at run start; the watch handler
/// overwrites it with the completed form (timestamps, phase durations,
/// detected files and a telemetry sub-summary) for external dashboards to
/// poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: CompletionStatus,
    pub tool: String,
    pub start_time: Option<DateTime<Utc>>,
    pub signal_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds from run start to the first signal.
    pub thinking_time: Option<f64>,
    /// Seconds from the first signal to the completing code artifact.
    pub writing_time: Option<f64>,
    pub total_time: Option<f64>,
    /// Seconds elapsed since run start at completion.
    pub gross_time: Option<f64>,
    #[serde(default)]
    pub detected_files: Vec<String>,
    pub telemetry: Option<TelemetrySummary>,
}

impl StatusSnapshot {
    /// The snapshot the distributor writes before any events arrive.
    pub fn pending(tool: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            status: CompletionStatus::Pending,
            tool: tool.into(),
            start_time: Some(start_time),
            signal_time: None,
            end_time: None,
            thinking_time: None,
            writing_time: None,
            total_time: None,
            gross_time: None,
            detected_files: Vec::new(),
            telemetry: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&CompletionStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        let json = serde_json::to_string(&CompletionStatus::Timeout).unwrap();
        assert_eq!(json, "\"timeout\"");
    }

    #[test]
    fn pending_snapshot_round_trips() {
        let snapshot = StatusSnapshot::pending("Cursor", Utc::now());
        let json = serde_json::to_string_pretty(&snapshot).unwrap();
        let back: StatusSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(back.status, CompletionStatus::Pending);
        assert_eq!(back.tool, "Cursor");
        assert!(back.thinking_time.is_none());
        assert!(back.detected_files.is_empty());
    }
}
