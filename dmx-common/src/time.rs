//! Timestamp utilities and the clock abstraction
//!
//! Dwell time is measured on a monotonic offset so wall-clock adjustments
//! cannot produce negative durations; event timestamps use UTC wall time.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Source of time for the viewing flow
pub trait Clock: Send + Sync {
    /// Wall-clock time for event timestamps
    fn now(&self) -> DateTime<Utc>;

    /// Monotonic offset from an arbitrary fixed origin
    fn monotonic(&self) -> Duration;
}

/// Real clock: `Utc::now()` plus an `Instant` origin captured at construction
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually advanced clock for tests and simulations
#[derive(Debug)]
pub struct ManualClock {
    start: DateTime<Utc>,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }

    fn offset(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let offset = chrono::Duration::from_std(self.offset()).unwrap_or(chrono::Duration::zero());
        self.start + offset
    }

    fn monotonic(&self) -> Duration {
        self.offset()
    }
}

/// Seconds between two monotonic offsets, clamped at zero and rounded to
/// two decimals
pub fn elapsed_seconds(start: Duration, end: Duration) -> f64 {
    let elapsed = end.checked_sub(start).unwrap_or(Duration::ZERO);
    (elapsed.as_secs_f64() * 100.0).round() / 100.0
}
