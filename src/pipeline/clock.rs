//! Monotonic reference clock for presentation scheduling
//!
//! The scheduler only needs one thing from a clock: a monotonic reading of
//! seconds since an arbitrary epoch. Production playback uses
//! [`MonotonicClock`]; tests and simulations drive a [`ManualClock`] so that
//! scheduling decisions become deterministic.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use super::types::Timestamp;

/// Source of monotonic time for the presentation scheduler.
///
/// Readings must never jump backward. The epoch is arbitrary; only
/// differences between readings matter, since the scheduler anchors the
/// first accepted frame to whatever the clock says at that moment.
pub trait PlaybackClock {
    /// Current monotonic reading.
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by [`Instant`], anchored at creation.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    base: Instant,
}

impl MonotonicClock {
    /// Create a clock whose epoch is the moment of this call.
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock for MonotonicClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_duration(self.base.elapsed())
    }
}

/// Manually driven clock for deterministic scheduling tests.
///
/// Clones share the same underlying reading, so one handle can be advanced
/// while another is owned by the scheduler.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicI64>,
}

impl ManualClock {
    /// Create a clock starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, delta: Duration) {
        self.micros
            .fetch_add(delta.as_micros() as i64, Ordering::Relaxed);
    }

    /// Set the clock to an absolute reading.
    pub fn set(&self, at: Duration) {
        self.micros.store(at.as_micros() as i64, Ordering::Relaxed);
    }
}

impl PlaybackClock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_micros(self.micros.load(Ordering::Relaxed))
    }
}
