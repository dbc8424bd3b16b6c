//! Presentation sink boundary
//!
//! The playout core stops at decoded planar frames: texture upload,
//! color-space conversion and display belong to the consumer behind this
//! trait.

use anyhow::Result;

use crate::decoder::DecodedFrame;

/// Consumer of frames the scheduler has released for display.
///
/// `present` receives the frame at (or as close as possible to) its intended
/// wall-clock moment and takes ownership of it. An error terminates the
/// playback run.
pub trait PresentationSink {
    fn present(&mut self, frame: DecodedFrame) -> Result<()>;
}
