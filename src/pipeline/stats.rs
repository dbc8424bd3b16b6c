//! Playback counters for the presentation scheduler

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one playback run.
///
/// All fields use atomic operations so a caller may watch them from another
/// thread (e.g. the thread that eventually cancels playback) while the
/// scheduler updates them.
#[derive(Debug, Default)]
pub struct PlaybackStats {
    /// Frames handed to the presentation sink
    presented: AtomicU64,

    /// Frames discarded for being more than the catch-up threshold late
    dropped: AtomicU64,

    /// Frames handed off with zero or negative slack (shown late, not dropped)
    late_presents: AtomicU64,
}

impl PlaybackStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_present(&self) {
        self.presented.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_late_present(&self) {
        self.late_presents.fetch_add(1, Ordering::Relaxed);
    }

    pub fn presented(&self) -> u64 {
        self.presented.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn late_presents(&self) -> u64 {
        self.late_presents.load(Ordering::Relaxed)
    }

    /// Dropped frames as a percentage of all pulled frames.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped();
        let total = dropped + self.presented();
        if total == 0 {
            return 0.0;
        }
        (dropped as f64 / total as f64) * 100.0
    }

    /// Snapshot for logging.
    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            presented: self.presented(),
            dropped: self.dropped(),
            late_presents: self.late_presents(),
            drop_rate: self.drop_rate(),
        }
    }
}

/// Snapshot of playback counters.
#[derive(Debug, Clone)]
pub struct StatsSummary {
    pub presented: u64,
    pub dropped: u64,
    pub late_presents: u64,
    pub drop_rate: f64,
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} presented ({} late), {} dropped ({:.2}%)",
            self.presented, self.late_presents, self.dropped, self.drop_rate
        )
    }
}
