//! The authoritative per-target record of behavioral events and timing.

use crate::{ResourceSampler, ResourceStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Kind of a recorded telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryEventKind {
    Signal,
    Retry,
    Save,
    RapidSave,
    Delete,
}

/// One entry in the chronological event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub time: DateTime<Utc>,
    pub kind: TelemetryEventKind,
    pub detail: String,
}

/// Immutable snapshot of a tracker: counters, phase timers (seconds) and
/// resource statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySummary {
    pub saves: u64,
    pub retries: u64,
    pub errors: u64,
    pub total_events: usize,
    pub thinking_time: Option<f64>,
    pub writing_time: Option<f64>,
    #[serde(default)]
    pub resources: ResourceStats,
}

#[derive(Debug, Default)]
struct TrackerState {
    saves: u64,
    retries: u64,
    errors: u64,
    signal_seen: bool,
    thinking: Option<Duration>,
    writing: Option<Duration>,
    known_files: HashMap<PathBuf, Instant>,
    events: Vec<TelemetryEvent>,
}

impl TrackerState {
    fn log(&mut self, kind: TelemetryEventKind, detail: String) {
        self.events.push(TelemetryEvent {
            time: Utc::now(),
            kind,
            detail,
        });
    }
}

/// Thread-safe telemetry for one benchmark target.
///
/// All recording methods take `&self` and serialize through an internal
/// lock, so the watcher's event-delivery task and the CLI's polling loop can
/// use the tracker concurrently.
pub struct TelemetryTracker {
    tool: String,
    rapid_save_window: Duration,
    sampler: ResourceSampler,
    state: Mutex<TrackerState>,
}

impl TelemetryTracker {
    pub fn new(
        tool: impl Into<String>,
        rapid_save_window: Duration,
        sample_interval: Duration,
    ) -> Self {
        let tool = tool.into();
        Self {
            sampler: ResourceSampler::new(tool.clone(), sample_interval),
            tool,
            rapid_save_window,
            state: Mutex::new(TrackerState::default()),
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    /// Record a start-signal event.
    ///
    /// The first call fixes `thinking_time = now - global_start`; every
    /// subsequent call counts as a retry and leaves the timer untouched.
    pub fn record_signal(&self, global_start: Instant) {
        let mut state = self.state.lock().expect("tracker lock poisoned");
        if state.signal_seen {
            state.retries += 1;
            let retries = state.retries;
            state.log(TelemetryEventKind::Retry, "signal file recreated".into());
            tracing::info!(tool = %self.tool, retries, "retry detected");
        } else {
            state.signal_seen = true;
            state.thinking = Some(Instant::now().saturating_duration_since(global_start));
            state.log(TelemetryEventKind::Signal, "signal file received".into());
        }
    }

    /// Record a signal synthesized at the run origin for a tool that wrote
    /// code without ever signalling.
    ///
    /// Fixes `thinking_time` at zero so the summary agrees with the
    /// handler's phase arithmetic. A no-op when a real signal was already
    /// seen.
    pub fn record_synthesized_signal(&self) {
        let mut state = self.state.lock().expect("tracker lock poisoned");
        if state.signal_seen {
            return;
        }
        state.signal_seen = true;
        state.thinking = Some(Duration::ZERO);
        state.log(
            TelemetryEventKind::Signal,
            "signal synthesized at run start".into(),
        );
    }

    /// Record completion of the writing phase.
    ///
    /// The caller (the watch handler) guarantees a single meaningful
    /// invocation via its completion latch.
    pub fn record_completion(&self, signal_time: Instant) {
        let mut state = self.state.lock().expect("tracker lock poisoned");
        state.writing = Some(Instant::now().saturating_duration_since(signal_time));
    }

    /// Record a file save; a re-save of the same path within the rapid-save
    /// window also counts as an error (edit-fix cycle heuristic).
    pub fn record_save(&self, path: &Path) {
        let basename = basename_of(path);
        let now = Instant::now();
        let mut state = self.state.lock().expect("tracker lock poisoned");

        if let Some(prev) = state.known_files.get(path) {
            let delta = now.saturating_duration_since(*prev);
            if delta < self.rapid_save_window {
                state.errors += 1;
                state.log(
                    TelemetryEventKind::RapidSave,
                    format!("{basename} rewritten after {:.1}s", delta.as_secs_f64()),
                );
            }
        }

        state.known_files.insert(path.to_path_buf(), now);
        state.saves += 1;
        state.log(TelemetryEventKind::Save, format!("{basename} saved"));
    }

    /// Record a file deletion; deleting a tracked file counts as an error
    /// (a retracted attempt) and forgets the path.
    pub fn record_delete(&self, path: &Path) {
        let basename = basename_of(path);
        let mut state = self.state.lock().expect("tracker lock poisoned");
        if state.known_files.remove(path).is_some() {
            state.errors += 1;
            state.log(TelemetryEventKind::Delete, format!("{basename} deleted"));
        }
    }

    /// Immutable snapshot merging counters, timers and resource stats.
    pub fn summary(&self) -> TelemetrySummary {
        let stats = self.sampler.stats();
        let state = self.state.lock().expect("tracker lock poisoned");
        TelemetrySummary {
            saves: state.saves,
            retries: state.retries,
            errors: state.errors,
            total_events: state.events.len(),
            thinking_time: state.thinking.map(|d| d.as_secs_f64()),
            writing_time: state.writing.map(|d| d.as_secs_f64()),
            resources: stats,
        }
    }

    /// Copy of the chronological event log.
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.state
            .lock()
            .expect("tracker lock poisoned")
            .events
            .clone()
    }

    pub fn start_sampling(&self) {
        self.sampler.start();
    }

    pub async fn stop_sampling(&self) {
        self.sampler.stop().await;
    }

    /// Resource statistics collected so far.
    pub fn resource_stats(&self) -> ResourceStats {
        self.sampler.stats()
    }
}

fn basename_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(window_ms: u64) -> TelemetryTracker {
        TelemetryTracker::new(
            "test",
            Duration::from_millis(window_ms),
            Duration::from_secs(1),
        )
    }

    #[test]
    fn first_signal_sets_thinking_time_once() {
        let tracker = tracker(2000);
        let start = Instant::now();

        tracker.record_signal(start);
        let first = tracker.summary().thinking_time.unwrap();

        std::thread::sleep(Duration::from_millis(30));
        tracker.record_signal(start);
        tracker.record_signal(start);

        let summary = tracker.summary();
        assert_eq!(summary.retries, 2);
        assert_eq!(summary.thinking_time.unwrap(), first);
    }

    #[test]
    fn n_signals_yield_n_minus_one_retries() {
        let tracker = tracker(2000);
        let start = Instant::now();
        for _ in 0..5 {
            tracker.record_signal(start);
        }
        assert_eq!(tracker.summary().retries, 4);
    }

    #[test]
    fn rapid_resave_counts_one_error_per_pair() {
        let tracker = tracker(2000);
        let path = Path::new("solution.py");

        tracker.record_save(path);
        tracker.record_save(path);
        tracker.record_save(path);

        let summary = tracker.summary();
        assert_eq!(summary.saves, 3);
        assert_eq!(summary.errors, 2);
    }

    #[test]
    fn slow_resave_is_not_an_error() {
        let tracker = tracker(20);
        let path = Path::new("solution.py");

        tracker.record_save(path);
        std::thread::sleep(Duration::from_millis(40));
        tracker.record_save(path);

        let summary = tracker.summary();
        assert_eq!(summary.saves, 2);
        assert_eq!(summary.errors, 0);
    }

    #[test]
    fn deleting_a_tracked_file_is_an_error() {
        let tracker = tracker(2000);
        let path = Path::new("solution.py");

        tracker.record_save(path);
        tracker.record_delete(path);

        assert_eq!(tracker.summary().errors, 1);
    }

    #[test]
    fn deleting_an_unknown_file_is_ignored() {
        let tracker = tracker(2000);
        tracker.record_delete(Path::new("never_seen.py"));
        assert_eq!(tracker.summary().errors, 0);
    }

    #[test]
    fn delete_then_resave_does_not_trip_rapid_window() {
        let tracker = tracker(2000);
        let path = Path::new("solution.py");

        tracker.record_save(path);
        tracker.record_delete(path);
        tracker.record_save(path);

        // Only the delete is an error; the path was forgotten in between.
        let summary = tracker.summary();
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.saves, 2);
    }

    #[test]
    fn synthesized_signal_fixes_zero_thinking() {
        let tracker = tracker(2000);
        std::thread::sleep(Duration::from_millis(30));
        tracker.record_synthesized_signal();

        assert_eq!(tracker.summary().thinking_time, Some(0.0));

        // A later real signal is a retry, not a new thinking phase.
        tracker.record_signal(Instant::now());
        let summary = tracker.summary();
        assert_eq!(summary.retries, 1);
        assert_eq!(summary.thinking_time, Some(0.0));
    }

    #[test]
    fn synthesized_signal_after_real_signal_is_ignored() {
        let tracker = tracker(2000);
        let start = Instant::now();
        std::thread::sleep(Duration::from_millis(20));
        tracker.record_signal(start);
        let first = tracker.summary().thinking_time.unwrap();

        tracker.record_synthesized_signal();
        assert_eq!(tracker.summary().thinking_time.unwrap(), first);
        assert_eq!(tracker.summary().retries, 0);
    }

    #[test]
    fn completion_sets_writing_time() {
        let tracker = tracker(2000);
        let signal_time = Instant::now();
        std::thread::sleep(Duration::from_millis(20));
        tracker.record_completion(signal_time);

        let writing = tracker.summary().writing_time.unwrap();
        assert!(writing >= 0.02);
    }

    #[test]
    fn summary_logs_events_chronologically() {
        let tracker = tracker(2000);
        let start = Instant::now();
        tracker.record_signal(start);
        tracker.record_save(Path::new("a.py"));
        tracker.record_signal(start);

        let events = tracker.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, TelemetryEventKind::Signal);
        assert_eq!(events[1].kind, TelemetryEventKind::Save);
        assert_eq!(events[2].kind, TelemetryEventKind::Retry);
        assert_eq!(tracker.summary().total_events, 3);
    }

    #[test]
    fn fresh_tracker_has_empty_summary() {
        let summary = tracker(2000).summary();
        assert_eq!(summary, TelemetrySummary::default());
    }
}
