//! Timestamp of the most recent observed sample.
//!
//! Written by the listener callback, read by the adaptive active-request
//! schedule. Stored as a single atomic offset from a fixed origin so readers
//! never see a torn value and no lock is shared with the session state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Sentinel for "no sample observed yet".
const UNSET: u64 = 0;

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
pub(crate) fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug)]
pub struct LastObservationClock {
    origin: Instant,
    /// Nanoseconds since `origin`, plus one. `UNSET` until the first record.
    last: AtomicU64,
}

impl Default for LastObservationClock {
    fn default() -> Self {
        Self::new()
    }
}

impl LastObservationClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last: AtomicU64::new(UNSET),
        }
    }

    /// Record an observation at `at`. Instants before the clock's origin are
    /// clamped to the origin.
    pub fn record(&self, at: Instant) {
        let offset = at.saturating_duration_since(self.origin).as_nanos();
        let encoded = u64::try_from(offset).unwrap_or(u64::MAX - 1) + 1;
        self.last.store(encoded, Ordering::Release);
    }

    /// Record an observation at the current instant.
    pub fn record_now(&self) {
        self.record(Instant::now());
    }

    /// The instant of the most recent observation, if any.
    pub fn last(&self) -> Option<Instant> {
        match self.last.load(Ordering::Acquire) {
            UNSET => None,
            encoded => Some(self.origin + Duration::from_nanos(encoded - 1)),
        }
    }

    /// Time between the most recent observation and `now`. An observation
    /// recorded after `now` counts as zero elapsed.
    pub fn elapsed_at(&self, now: Instant) -> Option<Duration> {
        self.last().map(|last| now.saturating_duration_since(last))
    }
}
