//! Presentation pipeline for the playout core
//!
//! Separates concerns between:
//! - Timing: monotonic clock and the anchored media timestamp type
//! - Scheduling: drop/wait decisions against the presentation deadline
//! - Handoff: the sink boundary where frames leave the core
//! - Observability: playback counters
//!
//! The scheduler owns the control flow: it pulls from the decode pipeline,
//! evaluates each frame against the clock, and either discards it or hands
//! it to the sink at the right moment.

pub mod clock;
pub mod scheduler;
pub mod sink;
pub mod stats;
pub mod types;

pub use clock::{ManualClock, MonotonicClock, PlaybackClock};
pub use scheduler::{PlaybackEnd, PresentationScheduler, SchedulerConfig, SchedulerState};
pub use sink::PresentationSink;
pub use stats::{PlaybackStats, StatsSummary};
pub use types::Timestamp;
