//! Concurrent multi-target filesystem watcher.

use crate::{CompletionStatus, TargetHandler, WatchError};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use vibebench_core::{BenchConfig, RunClock};
use vibebench_telemetry::{TelemetrySummary, TelemetryTracker};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Final per-target outcome extracted once the watch phase ends.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TargetReport {
    pub name: String,
    pub dir: PathBuf,
    pub status: CompletionStatus,
    pub signal_received: bool,
    pub thinking_time: Option<f64>,
    pub writing_time: Option<f64>,
    pub total_time: Option<f64>,
    pub gross_time: Option<f64>,
    pub detected_files: Vec<String>,
    pub telemetry: TelemetrySummary,
}

/// Watches every target directory concurrently until all targets complete or
/// the deadline passes.
///
/// Each target gets its own notify subscription whose callback forwards raw
/// events over an unbounded channel into a tokio task; that task drives the
/// target's [`TargetHandler`]. A separate aggregator task collects the
/// exactly-once completion messages and flips a watch channel when the last
/// target finishes, so [`wait`](Self::wait) is a plain `select!` against the
/// deadline rather than a polling loop.
pub struct BenchmarkWatcher {
    config: Arc<BenchConfig>,
    handlers: Vec<Arc<TargetHandler>>,
    // Dropping a notify watcher unsubscribes it, so they live here.
    watchers: Vec<RecommendedWatcher>,
    forwarders: Vec<JoinHandle<()>>,
    aggregator: Option<JoinHandle<()>>,
    all_done_rx: watch::Receiver<bool>,
    cancel: CancellationToken,
}

impl BenchmarkWatcher {
    /// Subscribe to every target directory and start resource sampling.
    ///
    /// A target whose subscription cannot be established is logged and left
    /// without a watch (it will time out); the rest of the run proceeds.
    pub fn start(config: Arc<BenchConfig>, clock: RunClock) -> Result<Self, WatchError> {
        if config.targets.is_empty() {
            return Err(WatchError::NoTargets);
        }

        let cancel = CancellationToken::new();
        let (done_tx, done_rx) = mpsc::unbounded_channel::<String>();
        let (all_done_tx, all_done_rx) = watch::channel(false);

        let mut handlers = Vec::with_capacity(config.targets.len());
        let mut watchers = Vec::with_capacity(config.targets.len());
        let mut forwarders = Vec::with_capacity(config.targets.len());

        for target in &config.targets {
            if let Err(err) = std::fs::create_dir_all(&target.dir) {
                tracing::error!(tool = %target.name, %err, "cannot create target directory");
            }

            let telemetry = Arc::new(TelemetryTracker::new(
                &target.name,
                config.rapid_save_window,
                config.sample_interval,
            ));
            telemetry.start_sampling();

            let handler = Arc::new(TargetHandler::new(
                target.clone(),
                Arc::clone(&config),
                clock,
                telemetry,
                done_tx.clone(),
            ));

            let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Event>();
            let tool = target.name.clone();
            let subscription = notify::recommended_watcher(
                move |res: Result<notify::Event, notify::Error>| match res {
                    Ok(event) => {
                        let _ = event_tx.send(event);
                    }
                    Err(err) => {
                        tracing::warn!(tool = %tool, %err, "watch backend error");
                    }
                },
            )
            .and_then(|mut watcher| {
                watcher.watch(&target.dir, RecursiveMode::Recursive)?;
                Ok(watcher)
            });
            match subscription {
                Ok(watcher) => {
                    tracing::info!(tool = %target.name, dir = %target.dir.display(), "watching");

                    let forward_handler = Arc::clone(&handler);
                    let forward_cancel = cancel.clone();
                    forwarders.push(tokio::spawn(async move {
                        loop {
                            tokio::select! {
                                _ = forward_cancel.cancelled() => break,
                                event = event_rx.recv() => match event {
                                    Some(event) => forward_handler.handle_event(&event),
                                    None => break,
                                },
                            }
                        }
                    }));
                    watchers.push(watcher);
                }
                // The target keeps its handler and tracker but will never
                // see events; it surfaces as a timeout, not a run failure.
                Err(err) => {
                    tracing::error!(tool = %target.name, %err, "watch subscription failed");
                }
            }

            handlers.push(handler);
        }
        drop(done_tx);

        let pending: HashSet<String> = config.targets.iter().map(|t| t.name.clone()).collect();
        let aggregator = tokio::spawn(aggregate_completions(done_rx, pending, all_done_tx));

        Ok(Self {
            config,
            handlers,
            watchers,
            forwarders,
            aggregator: Some(aggregator),
            all_done_rx,
            cancel,
        })
    }

    /// Block until every target completes or `timeout` elapses.
    ///
    /// Returns `true` when all targets finished within the deadline.
    pub async fn wait(&mut self, timeout: Duration) -> bool {
        if *self.all_done_rx.borrow() {
            return true;
        }
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);
        loop {
            tokio::select! {
                _ = &mut deadline => return *self.all_done_rx.borrow(),
                changed = self.all_done_rx.changed() => {
                    if changed.is_err() || *self.all_done_rx.borrow() {
                        return *self.all_done_rx.borrow();
                    }
                }
            }
        }
    }

    /// `true` once every target has completed.
    pub fn all_done(&self) -> bool {
        *self.all_done_rx.borrow()
    }

    pub fn handlers(&self) -> &[Arc<TargetHandler>] {
        &self.handlers
    }

    /// Unsubscribe, stop samplers, mark stragglers as timed out and join the
    /// background tasks.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        // Dropping the subscriptions closes the event channels, which ends
        // the forwarding tasks even if cancellation raced them.
        self.watchers.clear();

        for handler in &self.handlers {
            handler.telemetry().stop_sampling().await;
            if !handler.completed() {
                self.write_timeout_status(handler);
            }
        }

        for task in self.forwarders.drain(..) {
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                tracing::warn!("event forwarder did not stop in time");
            }
        }
        if let Some(task) = self.aggregator.take() {
            task.abort();
            let _ = task.await;
        }
    }

    fn write_timeout_status(&self, handler: &Arc<TargetHandler>) {
        let mut snapshot = handler.snapshot();
        snapshot.status = CompletionStatus::Timeout;
        let target = self
            .config
            .targets
            .iter()
            .find(|t| t.name == handler.name());
        let Some(target) = target else { return };
        let path = target.dir.join(&self.config.status_file);
        let result = serde_json::to_string_pretty(&snapshot)
            .map_err(std::io::Error::other)
            .and_then(|json| std::fs::write(&path, json));
        if let Err(err) = result {
            tracing::error!(tool = %handler.name(), %err, "failed to write timeout status");
        }
        tracing::warn!(tool = %handler.name(), "target timed out");
    }

    /// Final per-target reports, in configuration order.
    pub fn results(&self) -> Vec<TargetReport> {
        self.config
            .targets
            .iter()
            .zip(&self.handlers)
            .map(|(target, handler)| TargetReport {
                name: target.name.clone(),
                dir: target.dir.clone(),
                status: if handler.completed() {
                    CompletionStatus::Completed
                } else {
                    CompletionStatus::Timeout
                },
                signal_received: handler.signal_received(),
                thinking_time: handler.thinking_time(),
                writing_time: handler.writing_time(),
                total_time: handler.total_time(),
                gross_time: Some(handler.elapsed()),
                detected_files: handler.detected_files(),
                telemetry: handler.telemetry().summary(),
            })
            .collect()
    }

    /// Telemetry summaries keyed by tool name.
    pub fn telemetry(&self) -> BTreeMap<String, TelemetrySummary> {
        self.handlers
            .iter()
            .map(|h| (h.name().to_string(), h.telemetry().summary()))
            .collect()
    }
}

async fn aggregate_completions(
    mut done_rx: mpsc::UnboundedReceiver<String>,
    mut pending: HashSet<String>,
    all_done_tx: watch::Sender<bool>,
) {
    while let Some(name) = done_rx.recv().await {
        if pending.remove(&name) {
            tracing::info!(tool = %name, remaining = pending.len(), "target finished");
        }
        if pending.is_empty() {
            let _ = all_done_tx.send(true);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use vibebench_core::{RawBenchConfig, RawTarget};

    fn config_for(dirs: &[(&str, PathBuf)]) -> Arc<BenchConfig> {
        let raw = RawBenchConfig {
            targets: dirs
                .iter()
                .map(|(name, dir)| RawTarget {
                    name: (*name).into(),
                    dir: dir.clone(),
                })
                .collect(),
            ..Default::default()
        };
        Arc::new(BenchConfig::finalize(raw).unwrap())
    }

    async fn wait_until(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < deadline {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        check()
    }

    fn touch(path: &Path, contents: &str) {
        fs::write(path, contents).unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn two_targets_complete_independently() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a");
        let b = tmp.path().join("b");
        let config = config_for(&[("A", a.clone()), ("B", b.clone())]);

        let mut watcher = BenchmarkWatcher::start(Arc::clone(&config), RunClock::now()).unwrap();

        touch(&a.join("start_signal.json"), "{}");
        touch(&a.join("main.py"), "print('a')");
        assert!(
            wait_until(Duration::from_secs(5), || watcher.handlers()[0].completed()).await,
            "target A should complete"
        );
        assert!(!watcher.all_done(), "B is still pending");

        touch(&b.join("start_signal.json"), "{}");
        touch(&b.join("app.js"), "console.log('b')");
        assert!(watcher.wait(Duration::from_secs(5)).await, "all targets done");

        let results = watcher.results();
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .all(|r| r.status == CompletionStatus::Completed));
        assert!(results.iter().all(|r| r.total_time.is_some()));

        watcher.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deadline_expiry_reports_timeout() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("slow");
        let config = config_for(&[("Slow", dir.clone())]);

        let mut watcher = BenchmarkWatcher::start(Arc::clone(&config), RunClock::now()).unwrap();
        assert!(!watcher.wait(Duration::from_millis(200)).await);
        watcher.stop().await;

        let results = watcher.results();
        assert_eq!(results[0].status, CompletionStatus::Timeout);
        assert!(results[0].total_time.is_none());

        let raw = fs::read_to_string(dir.join("status.json")).unwrap();
        let snapshot: crate::StatusSnapshot = serde_json::from_str(&raw).unwrap();
        assert_eq!(snapshot.status, CompletionStatus::Timeout);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reserved_files_do_not_complete_a_target() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("t");
        let config = config_for(&[("T", dir.clone())]);

        let mut watcher = BenchmarkWatcher::start(Arc::clone(&config), RunClock::now()).unwrap();
        touch(&dir.join("task_input.txt"), "prompt");
        touch(&dir.join("status.json"), "{}");
        touch(&dir.join("notes.md"), "not code");

        assert!(!watcher.wait(Duration::from_millis(300)).await);
        assert!(!watcher.handlers()[0].completed());
        watcher.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn code_in_subdirectory_completes_the_target() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("t");
        let config = config_for(&[("T", dir.clone())]);

        let mut watcher = BenchmarkWatcher::start(Arc::clone(&config), RunClock::now()).unwrap();
        fs::create_dir_all(dir.join("src")).unwrap();
        touch(&dir.join("start_signal.json"), "{}");
        touch(&dir.join("src/lib.rs"), "pub fn f() {}");

        assert!(watcher.wait(Duration::from_secs(5)).await);
        let results = watcher.results();
        assert_eq!(results[0].detected_files, vec!["lib.rs"]);
        watcher.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn telemetry_map_is_keyed_by_tool() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("t");
        let config = config_for(&[("Zed", dir.clone())]);

        let mut watcher = BenchmarkWatcher::start(Arc::clone(&config), RunClock::now()).unwrap();
        touch(&dir.join("start_signal.json"), "{}");
        touch(&dir.join("main.go"), "package main");

        assert!(watcher.wait(Duration::from_secs(5)).await);
        watcher.stop().await;

        let telemetry = watcher.telemetry();
        let summary = telemetry.get("Zed").unwrap();
        assert!(summary.saves >= 1);
        assert!(summary.thinking_time.is_some());
        assert!(summary.writing_time.is_some());
    }
}
