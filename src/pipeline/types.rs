//! Core time types for the playout pipeline

use std::time::Duration;

/// Media timestamp in microseconds.
///
/// Used both for frame presentation timestamps (converted from the stream
/// time base by the decode session) and for monotonic clock readings.
/// Signed so that anchor arithmetic can go negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    micros: i64,
}

impl Timestamp {
    /// Timestamp zero, substituted when a decoded picture carries no PTS.
    pub const ZERO: Timestamp = Timestamp { micros: 0 };

    /// Create a new timestamp from microseconds.
    pub const fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    /// Create a timestamp from a duration since the relevant epoch.
    pub fn from_duration(duration: Duration) -> Self {
        Self {
            micros: duration.as_micros() as i64,
        }
    }

    /// Raw microsecond value.
    pub const fn micros(&self) -> i64 {
        self.micros
    }

    /// Convert to a duration, saturating negative values to zero.
    pub fn as_duration(&self) -> Duration {
        Duration::from_micros(self.micros.max(0) as u64)
    }

    /// Timestamp in seconds, as the presentation contract exposes it.
    pub fn as_secs_f64(&self) -> f64 {
        self.micros as f64 / 1_000_000.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}µs", self.micros)
    }
}
