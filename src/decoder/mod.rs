//! Decode pipeline: bitstream in, timestamped frames out
//!
//! The session reads compressed packets from the container and drives the
//! video decoder; callers only ever see whole frames, end of stream, or a
//! terminal error.

pub mod frame;
pub mod session;

pub use frame::{DecodedFrame, FramePlane};
pub use session::{DecodeSession, StreamInfo};

use crate::error::DecodeError;

/// Outcome of one frame pull: either a decoded picture or the normal
/// completion signal. "No frame yet, call again" is handled internally and
/// never surfaces here.
pub enum NextFrame {
    Frame(DecodedFrame),
    EndOfStream,
}

/// Pull-based frame producer consumed by the presentation scheduler.
///
/// Implemented by [`DecodeSession`]; the seam also lets tests drive the
/// scheduler with scripted sources.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<NextFrame, DecodeError>;
}
