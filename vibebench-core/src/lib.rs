//! Core configuration and shared types for vibebench.
//!
//! A benchmark run is described by an immutable [`BenchConfig`] built once at
//! startup and passed by reference into every component — there is no ambient
//! global state. The [`RunClock`] pairs the monotonic origin used for all
//! phase arithmetic with a wall-clock reading used in persisted snapshots.

mod clock;
mod config;
mod error;
mod target;

pub use clock::{RunClock, RunId};
pub use config::{BenchConfig, RawBenchConfig, RawTarget};
pub use error::ConfigError;
pub use target::Target;
