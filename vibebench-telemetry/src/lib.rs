//! Per-target behavioral telemetry for vibebench.
//!
//! Each benchmark target owns one [`TelemetryTracker`]: the authoritative,
//! thread-safe record of file events (saves, retries, errors) and phase
//! timers for that target. The tracker owns a [`ResourceSampler`] that
//! measures the current process's CPU and memory on a fixed cadence in a
//! background task.
//!
//! Trackers are mutated from the watcher's event-delivery task and read from
//! the CLI's polling loop; every read copies data out under the lock so a
//! reader never observes a torn update.

mod sampler;
mod tracker;

pub use sampler::{ResourceSampler, ResourceStats};
pub use tracker::{
    TelemetryEvent, TelemetryEventKind, TelemetrySummary, TelemetryTracker,
};
