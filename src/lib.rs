//! PTS-scheduled video playout core
//!
//! Decodes a compressed video stream into timestamped raw frames and
//! releases them to a presentation sink at the correct wall-clock moment,
//! dropping frames when playback falls too far behind schedule.
//!
//! Two components, composed in a producer/consumer relationship:
//! - [`DecodeSession`]: owns the demux/decode state and exposes a pull-based
//!   frame contract over the packet-oriented FFmpeg machinery.
//! - [`PresentationScheduler`]: anchors a monotonic clock to the first
//!   frame's PTS and, per pulled frame, decides to drop, wait-then-present,
//!   or present immediately.
//!
//! GPU upload, color conversion, windowing and input handling are external
//! collaborators behind the [`PresentationSink`] trait.
//!
//! ```no_run
//! use playout::{DecodeSession, MonotonicClock, PresentationScheduler};
//! # use playout::{DecodedFrame, PresentationSink};
//! # struct Display;
//! # impl PresentationSink for Display {
//! #     fn present(&mut self, _frame: DecodedFrame) -> anyhow::Result<()> { Ok(()) }
//! # }
//! # fn main() -> anyhow::Result<()> {
//! let mut session = DecodeSession::open("movie.mp4")?;
//! let mut scheduler = PresentationScheduler::new(MonotonicClock::new());
//! let mut display = Display;
//! scheduler.run(&mut session, &mut display)?;
//! session.close();
//! # Ok(())
//! # }
//! ```

pub mod decoder;
pub mod error;
pub mod pipeline;
pub mod utils;

pub use decoder::{DecodeSession, DecodedFrame, FramePlane, FrameSource, NextFrame, StreamInfo};
pub use error::{DecodeError, OpenError, PlaybackError};
pub use pipeline::{
    ManualClock, MonotonicClock, PlaybackClock, PlaybackEnd, PlaybackStats, PresentationScheduler,
    PresentationSink, SchedulerConfig, SchedulerState, Timestamp,
};
pub use utils::sos::SignalOfStop;
