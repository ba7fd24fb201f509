//! Error types for vibebench-watch.

use thiserror::Error;

/// Errors from distribution and watch setup.
///
/// Per-event processing faults are never surfaced here — they are logged and
/// skipped inside the handlers.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("no benchmark targets configured")]
    NoTargets,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("watch subscription error: {0}")]
    Notify(#[from] notify::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
