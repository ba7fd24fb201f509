//! Prompt distribution and two-phase file watching for vibebench.
//!
//! The pipeline: [`distribute`] writes the prompt and a pending status
//! snapshot into every target directory and fixes the shared run clock.
//! External tool agents then edit files in their directories, and one
//! [`TargetHandler`] per target classifies the raw filesystem events into
//! signal / code / ignored, drives the thinking→writing state machine, and
//! updates telemetry. [`BenchmarkWatcher`] owns the notify subscriptions and
//! handlers, aggregates completion, and exposes the results snapshot the
//! scorer consumes.

mod distributor;
mod error;
mod handler;
mod status;
mod watcher;

pub use distributor::{distribute, Distribution, TargetDistribution};
pub use error::WatchError;
pub use handler::TargetHandler;
pub use status::{CompletionStatus, StatusSnapshot};
pub use watcher::{BenchmarkWatcher, TargetReport};
