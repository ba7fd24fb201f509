//! Background CPU/RAM sampling for one tracked tool.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sysinfo::{Pid, System};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Upper bound on retained samples; oldest are dropped beyond this.
const MAX_SAMPLES: usize = 4096;

/// Grace period for the sampling task to wind down on `stop()`.
const STOP_GRACE: Duration = Duration::from_secs(3);

/// Reduced statistics over the collected samples.
///
/// All fields are zero when no samples exist — an unavailable sampler is a
/// valid all-zero state, never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceStats {
    pub avg_cpu: f64,
    pub peak_cpu: f64,
    pub avg_ram_mb: f64,
    pub peak_ram_mb: f64,
    pub sample_count: usize,
}

#[derive(Debug, Default)]
struct SampleBuffer {
    cpu: VecDeque<f64>,
    ram_mb: VecDeque<f64>,
}

impl SampleBuffer {
    fn push(&mut self, cpu: f64, ram_mb: f64) {
        if self.cpu.len() == MAX_SAMPLES {
            self.cpu.pop_front();
            self.ram_mb.pop_front();
        }
        self.cpu.push_back(cpu);
        self.ram_mb.push_back(ram_mb);
    }

    fn stats(&self) -> ResourceStats {
        if self.cpu.is_empty() {
            return ResourceStats::default();
        }
        let count = self.cpu.len();
        ResourceStats {
            avg_cpu: self.cpu.iter().sum::<f64>() / count as f64,
            peak_cpu: self.cpu.iter().cloned().fold(0.0, f64::max),
            avg_ram_mb: self.ram_mb.iter().sum::<f64>() / count as f64,
            peak_ram_mb: self.ram_mb.iter().cloned().fold(0.0, f64::max),
            sample_count: count,
        }
    }
}

/// Periodic sampler of the current process's CPU% and resident memory.
///
/// `start()` spawns the sampling loop; per-sample failures are logged and
/// skipped so the loop never dies mid-run. `stats()` can be called
/// concurrently with ongoing sampling.
pub struct ResourceSampler {
    tool: String,
    interval: Duration,
    samples: Arc<Mutex<SampleBuffer>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ResourceSampler {
    pub fn new(tool: impl Into<String>, interval: Duration) -> Self {
        Self {
            tool: tool.into(),
            interval,
            samples: Arc::new(Mutex::new(SampleBuffer::default())),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    /// Begin the background sampling loop.
    ///
    /// A no-op (with a warning) when the process id cannot be resolved or
    /// when sampling is already running.
    pub fn start(&self) {
        let mut slot = self.task.lock().expect("sampler task lock poisoned");
        if slot.is_some() {
            tracing::warn!(tool = %self.tool, "resource sampler already running");
            return;
        }
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => pid,
            Err(err) => {
                tracing::warn!(tool = %self.tool, %err, "resource sampling unavailable");
                return;
            }
        };

        let samples = Arc::clone(&self.samples);
        let cancel = self.cancel.clone();
        let interval = self.interval;
        let tool = self.tool.clone();
        *slot = Some(tokio::spawn(async move {
            Self::sample_loop(pid, interval, samples, cancel, tool).await;
        }));
    }

    async fn sample_loop(
        pid: Pid,
        interval: Duration,
        samples: Arc<Mutex<SampleBuffer>>,
        cancel: CancellationToken,
        tool: String,
    ) {
        let mut system = System::new();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }

            // cpu_usage() measures over the window since the previous
            // refresh; the first tick reads as 0.
            system.refresh_process(pid);
            match system.process(pid) {
                Some(process) => {
                    let cpu = f64::from(process.cpu_usage());
                    let ram_mb = process.memory() as f64 / (1024.0 * 1024.0);
                    samples
                        .lock()
                        .expect("sample buffer lock poisoned")
                        .push(cpu, ram_mb);
                }
                None => {
                    tracing::debug!(tool = %tool, "process not visible this tick, skipping sample");
                }
            }
        }
    }

    /// Signal the loop to end and wait for it within a bounded grace period.
    ///
    /// Safe to call when the sampler was never started.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handle = self
            .task
            .lock()
            .expect("sampler task lock poisoned")
            .take();
        if let Some(handle) = handle {
            if tokio::time::timeout(STOP_GRACE, handle).await.is_err() {
                tracing::warn!(tool = %self.tool, "resource sampler did not stop in time");
            }
        }
    }

    /// Snapshot of reduced statistics; all zero when nothing was sampled.
    pub fn stats(&self) -> ResourceStats {
        self.samples
            .lock()
            .expect("sample buffer lock poisoned")
            .stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_yields_all_zero_stats() {
        let sampler = ResourceSampler::new("test", Duration::from_secs(1));
        assert_eq!(sampler.stats(), ResourceStats::default());
    }

    #[test]
    fn buffer_reduces_avg_and_peak() {
        let mut buffer = SampleBuffer::default();
        buffer.push(10.0, 100.0);
        buffer.push(30.0, 300.0);

        let stats = buffer.stats();
        assert_eq!(stats.sample_count, 2);
        assert_eq!(stats.avg_cpu, 20.0);
        assert_eq!(stats.peak_cpu, 30.0);
        assert_eq!(stats.avg_ram_mb, 200.0);
        assert_eq!(stats.peak_ram_mb, 300.0);
    }

    #[test]
    fn buffer_is_bounded() {
        let mut buffer = SampleBuffer::default();
        for i in 0..(MAX_SAMPLES + 100) {
            buffer.push(i as f64, i as f64);
        }
        assert_eq!(buffer.stats().sample_count, MAX_SAMPLES);
        // Oldest samples were dropped.
        assert_eq!(buffer.cpu.front().copied(), Some(100.0));
    }

    #[tokio::test]
    async fn stop_without_start_is_safe() {
        let sampler = ResourceSampler::new("test", Duration::from_millis(10));
        sampler.stop().await;
        assert_eq!(sampler.stats().sample_count, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sampler_collects_samples_while_running() {
        let sampler = ResourceSampler::new("test", Duration::from_millis(20));
        sampler.start();
        tokio::time::sleep(Duration::from_millis(200)).await;
        sampler.stop().await;

        let stats = sampler.stats();
        assert!(stats.sample_count > 0, "expected at least one sample");
        assert!(stats.peak_ram_mb > 0.0, "a live process has nonzero RSS");
    }

    #[tokio::test]
    async fn double_start_is_a_noop() {
        let sampler = ResourceSampler::new("test", Duration::from_millis(50));
        sampler.start();
        sampler.start();
        sampler.stop().await;
    }
}
