//! Error taxonomy for the playout core
//!
//! Session-setup failures are terminal and surfaced at `open`; decode
//! failures are terminal for the current session and surfaced at
//! `next_frame`. End-of-stream is not an error and is reported through
//! `NextFrame::EndOfStream` instead.

use thiserror::Error;

/// Failure while opening a source and setting up the decode session.
///
/// Every variant is terminal: no partial session survives a failed open.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The container could not be opened or probed.
    #[error("unable to open source {path}: {reason}")]
    SourceUnavailable { path: String, reason: String },

    /// The container was opened but holds no decodable video stream.
    #[error("no video stream found in {path}")]
    NoVideoStream { path: String },

    /// A video stream exists but no decoder is available for its codec.
    #[error("unsupported codec: {reason}")]
    UnsupportedCodec { reason: String },

    /// Decoder context construction failed during setup.
    #[error("could not allocate decoder context: {reason}")]
    AllocationFailure { reason: String },
}

/// Failure while pulling the next frame from an open session.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The demuxer failed to read a packet. Distinct from end of input,
    /// which is reported as `NextFrame::EndOfStream`.
    #[error("packet read failed: {0}")]
    Read(String),

    /// The decoder rejected a packet or failed to produce a picture.
    #[error("decoder error: {0}")]
    Codec(String),

    /// The packet retry loop hit its iteration bound without producing
    /// a frame (pathological input).
    #[error("stream stalled: no video frame after reading {packets} packets")]
    StreamStalled { packets: usize },

    /// The decoder produced something other than planar YUV 4:2:0.
    #[error("unsupported pixel format: decoder did not produce planar yuv420")]
    UnsupportedPixelFormat,
}

/// Failure that ends a scheduler run.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The presentation sink rejected a frame.
    #[error("presentation sink failed: {0}")]
    Sink(anyhow::Error),
}
