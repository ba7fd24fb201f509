//! Run identity and the shared timing origin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Unique identifier for one benchmark run (UUIDv7, time-ordered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The shared start-of-run reading handed to every target.
///
/// `started_at` is the monotonic origin all phase durations are computed
/// against; `started_wall` is the matching wall-clock timestamp used in
/// persisted snapshots. Both are captured in the same call so they describe
/// the same moment.
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    pub started_at: Instant,
    pub started_wall: DateTime<Utc>,
}

impl RunClock {
    /// Capture the current moment as the run origin.
    #[must_use]
    pub fn now() -> Self {
        Self {
            started_at: Instant::now(),
            started_wall: Utc::now(),
        }
    }

    /// Elapsed time since the run origin.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_is_unique_per_call() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn run_clock_elapsed_is_monotonic() {
        let clock = RunClock::now();
        let a = clock.elapsed();
        let b = clock.elapsed();
        assert!(b >= a);
    }
}
