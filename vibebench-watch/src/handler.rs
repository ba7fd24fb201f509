//! Per-target watch event handler: the two-phase state machine.

use crate::{CompletionStatus, StatusSnapshot};
use chrono::{DateTime, Utc};
use notify::event::EventKind;
use notify::Event;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::mpsc;
use vibebench_core::{BenchConfig, RunClock, Target};
use vibebench_telemetry::TelemetryTracker;

#[derive(Debug, Default)]
struct HandlerState {
    signal_received: bool,
    signal_time: Option<Instant>,
    signal_wall: Option<DateTime<Utc>>,
    completed: bool,
    end_time: Option<Instant>,
    end_wall: Option<DateTime<Utc>>,
    detected_files: Vec<PathBuf>,
}

/// Drives one target through `WAITING_SIGNAL → WAITING_CODE → COMPLETED`.
///
/// Raw filesystem events arrive on the watcher's delivery task; every
/// read-check-transition sequence runs under the state lock, so exactly one
/// event can ever decide "this is the first signal" or "this is the first
/// code artifact". The completion message is sent exactly once per target no
/// matter how many duplicate events the platform delivers.
pub struct TargetHandler {
    target: Target,
    config: Arc<BenchConfig>,
    clock: RunClock,
    telemetry: Arc<TelemetryTracker>,
    done_tx: mpsc::UnboundedSender<String>,
    state: Mutex<HandlerState>,
}

impl TargetHandler {
    pub fn new(
        target: Target,
        config: Arc<BenchConfig>,
        clock: RunClock,
        telemetry: Arc<TelemetryTracker>,
        done_tx: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            target,
            config,
            clock,
            telemetry,
            done_tx,
            state: Mutex::new(HandlerState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.target.name
    }

    pub fn telemetry(&self) -> &Arc<TelemetryTracker> {
        &self.telemetry
    }

    /// Classify and apply one raw filesystem event.
    ///
    /// Create/modify events feed the state machine; remove events feed the
    /// delete heuristic. Everything else is ignored.
    pub fn handle_event(&self, event: &Event) {
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => {
                for path in &event.paths {
                    self.on_write(path);
                }
            }
            EventKind::Remove(_) => {
                for path in &event.paths {
                    self.telemetry.record_delete(path);
                }
            }
            _ => {}
        }
    }

    fn on_write(&self, path: &Path) {
        if path.is_dir() {
            return;
        }
        let basename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => return,
        };

        // Phase 1: the signal file ends thinking and starts writing.
        if basename == self.config.signal_file {
            self.on_signal();
            return;
        }

        // Reserved control files and unwatched extensions never qualify.
        if self.config.is_reserved(&basename) || !self.config.is_watched(path) {
            return;
        }

        self.telemetry.record_save(path);
        self.on_code_artifact(path, &basename);
    }

    fn on_signal(&self) {
        self.telemetry.record_signal(self.clock.started_at);
        let mut state = self.state.lock().expect("handler lock poisoned");
        if !state.signal_received {
            let now = Instant::now();
            state.signal_received = true;
            state.signal_time = Some(now);
            state.signal_wall = Some(Utc::now());
            let thinking = now.saturating_duration_since(self.clock.started_at);
            tracing::info!(
                tool = %self.target.name,
                thinking_secs = thinking.as_secs_f64(),
                "start signal received, writing phase begins"
            );
        }
    }

    /// Phase 2: the first qualifying code artifact completes the target.
    fn on_code_artifact(&self, path: &Path, basename: &str) {
        let signal_time;
        {
            let mut state = self.state.lock().expect("handler lock poisoned");
            if !state.detected_files.iter().any(|p| p == path) {
                state.detected_files.push(path.to_path_buf());
            }
            if state.completed {
                return;
            }

            let now = Instant::now();
            state.end_time = Some(now);
            state.end_wall = Some(Utc::now());

            // Tools that skip the signal protocol still make progress: the
            // signal is synthesized at the run origin (zero thinking time).
            if !state.signal_received {
                state.signal_received = true;
                state.signal_time = Some(self.clock.started_at);
                state.signal_wall = Some(self.clock.started_wall);
                tracing::warn!(
                    tool = %self.target.name,
                    "code artifact before any signal, synthesizing signal at run start"
                );
                self.telemetry.record_synthesized_signal();
            }

            signal_time = state.signal_time.expect("signal time set above");
            state.completed = true;
        }

        self.telemetry.record_completion(signal_time);
        self.write_status();

        let (thinking, writing) = (self.thinking_time(), self.writing_time());
        tracing::info!(
            tool = %self.target.name,
            file = %basename,
            thinking_secs = ?thinking,
            writing_secs = ?writing,
            "target completed"
        );

        if self.done_tx.send(self.target.name.clone()).is_err() {
            tracing::debug!(tool = %self.target.name, "completion receiver already gone");
        }
    }

    /// Persist the completed status snapshot for external polling.
    ///
    /// Failures are logged and swallowed; a missing snapshot must not stall
    /// the run.
    fn write_status(&self) {
        let snapshot = self.snapshot();
        let path = self.target.dir.join(&self.config.status_file);
        let result = serde_json::to_string_pretty(&snapshot)
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(&path, json));
        if let Err(err) = result {
            tracing::error!(tool = %self.target.name, %err, "failed to write status snapshot");
        }
    }

    /// Build a status snapshot from the current state.
    pub fn snapshot(&self) -> StatusSnapshot {
        let state = self.state.lock().expect("handler lock poisoned");
        let thinking = state
            .signal_time
            .map(|t| t.saturating_duration_since(self.clock.started_at).as_secs_f64());
        let writing = match (state.end_time, state.signal_time) {
            (Some(end), Some(signal)) if state.completed => {
                Some(end.saturating_duration_since(signal).as_secs_f64())
            }
            _ => None,
        };
        let status = if state.completed {
            CompletionStatus::Completed
        } else {
            CompletionStatus::Pending
        };
        StatusSnapshot {
            status,
            tool: self.target.name.clone(),
            start_time: Some(self.clock.started_wall),
            signal_time: state.signal_wall,
            end_time: state.end_wall,
            thinking_time: thinking,
            writing_time: writing,
            total_time: match (thinking, writing) {
                (Some(t), Some(w)) => Some(t + w),
                _ => None,
            },
            gross_time: state
                .end_time
                .map(|end| end.saturating_duration_since(self.clock.started_at).as_secs_f64()),
            detected_files: state
                .detected_files
                .iter()
                .map(|p| basename_string(p))
                .collect(),
            telemetry: Some(self.telemetry.summary()),
        }
    }

    /// Seconds from run start to the first signal; `None` until a signal
    /// (real or synthesized) exists.
    pub fn thinking_time(&self) -> Option<f64> {
        let state = self.state.lock().expect("handler lock poisoned");
        state
            .signal_time
            .map(|t| t.saturating_duration_since(self.clock.started_at).as_secs_f64())
    }

    /// Seconds from the first signal to completion; `None` until completed.
    pub fn writing_time(&self) -> Option<f64> {
        let state = self.state.lock().expect("handler lock poisoned");
        match (state.completed, state.signal_time, state.end_time) {
            (true, Some(signal), Some(end)) => {
                Some(end.saturating_duration_since(signal).as_secs_f64())
            }
            _ => None,
        }
    }

    /// `thinking + writing`, defined iff both are.
    pub fn total_time(&self) -> Option<f64> {
        match (self.thinking_time(), self.writing_time()) {
            (Some(t), Some(w)) => Some(t + w),
            _ => None,
        }
    }

    /// Seconds elapsed since run start (frozen at completion).
    pub fn elapsed(&self) -> f64 {
        let state = self.state.lock().expect("handler lock poisoned");
        let end = state.end_time.filter(|_| state.completed);
        match end {
            Some(end) => end.saturating_duration_since(self.clock.started_at).as_secs_f64(),
            None => self.clock.started_at.elapsed().as_secs_f64(),
        }
    }

    pub fn completed(&self) -> bool {
        self.state.lock().expect("handler lock poisoned").completed
    }

    pub fn signal_received(&self) -> bool {
        self.state
            .lock()
            .expect("handler lock poisoned")
            .signal_received
    }

    /// Basenames of all distinct qualifying files seen so far.
    pub fn detected_files(&self) -> Vec<String> {
        self.state
            .lock()
            .expect("handler lock poisoned")
            .detected_files
            .iter()
            .map(|p| basename_string(p))
            .collect()
    }
}

fn basename_string(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
