//! Demux/decode session
//!
//! Owns the open container, the selected video stream and its decoder, and
//! exposes the packet-oriented FFmpeg machinery through a frame-oriented
//! pull contract: each `next_frame` call yields one decoded picture, an
//! end-of-stream signal, or a terminal decode error. The internal
//! "decoder needs more data" condition never escapes this module.

use std::fs::File;
use std::path::Path;

use ac_ffmpeg::codec::Decoder;
use ac_ffmpeg::codec::video::{self, VideoDecoder};
use ac_ffmpeg::format::demuxer::{Demuxer, DemuxerWithStreamInfo};
use ac_ffmpeg::format::io::IO;
use ac_ffmpeg::time::TimeBase;
use bytes::Bytes;
use log::{info, warn};

use super::frame::{DecodedFrame, FramePlane};
use super::{FrameSource, NextFrame};
use crate::error::{DecodeError, OpenError};
use crate::pipeline::Timestamp;

/// Upper bound on packet reads per `next_frame` call. A well-formed stream
/// yields a video frame long before this; hitting the bound means the input
/// is pathological and the call fails instead of spinning.
const MAX_PACKET_READS_PER_FRAME: usize = 4096;

/// Stream metadata captured at open time, fixed for the session lifetime.
#[derive(Debug, Clone, Copy)]
pub struct StreamInfo {
    pub width: usize,
    pub height: usize,
    /// Seconds-per-tick scale of the selected stream's timestamps.
    pub time_base: TimeBase,
}

struct SessionInner {
    demuxer: DemuxerWithStreamInfo<File>,
    decoder: VideoDecoder,
    stream_index: usize,
    /// Set once the demuxer hits end of input and the decoder was flushed.
    draining: bool,
}

/// One demux/decode session over a single video source.
///
/// The session is an owned, explicitly-passed handle; nothing is process
/// wide, so instances never collide. The stream index and time base are
/// fixed at open. Terminal outcomes (end of stream, decode error) release
/// the FFmpeg state immediately; afterwards `next_frame` keeps returning
/// `NextFrame::EndOfStream`.
pub struct DecodeSession {
    inner: Option<SessionInner>,
    info: StreamInfo,
    missing_pts: u64,
}

unsafe impl Send for DecodeSession {}

impl std::fmt::Debug for DecodeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeSession")
            .field("info", &self.info)
            .field("missing_pts", &self.missing_pts)
            .field("open", &self.inner.is_some())
            .finish()
    }
}

impl DecodeSession {
    /// Open `path`, probe it, and set up a decoder for its best video stream.
    ///
    /// Fails atomically: every resource acquired before an error is dropped
    /// before the error is returned.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OpenError> {
        let path = path.as_ref();
        let shown = path.display().to_string();

        let file = File::open(path).map_err(|err| OpenError::SourceUnavailable {
            path: shown.clone(),
            reason: err.to_string(),
        })?;

        let io = IO::from_seekable_read_stream(file);

        let demuxer = Demuxer::builder()
            .build(io)
            .map_err(|err| OpenError::SourceUnavailable {
                path: shown.clone(),
                reason: err.to_string(),
            })?
            .find_stream_info(None)
            .map_err(|(_, err)| OpenError::SourceUnavailable {
                path: shown.clone(),
                reason: err.to_string(),
            })?;

        let (stream_index, stream) = demuxer
            .streams()
            .iter()
            .enumerate()
            .find(|(_, stream)| stream.codec_parameters().is_video_codec())
            .ok_or(OpenError::NoVideoStream { path: shown.clone() })?;

        let params = stream
            .codec_parameters()
            .into_video_codec_parameters()
            .ok_or(OpenError::NoVideoStream { path: shown.clone() })?;

        let info = StreamInfo {
            width: params.width(),
            height: params.height(),
            time_base: stream.time_base(),
        };

        let decoder = VideoDecoder::from_stream(stream)
            .map_err(|err| OpenError::UnsupportedCodec {
                reason: err.to_string(),
            })?
            .build()
            .map_err(|err| OpenError::AllocationFailure {
                reason: err.to_string(),
            })?;

        info!(
            "DecodeSession: opened {} ({}x{}, video stream {}, time base {:?})",
            shown, info.width, info.height, stream_index, info.time_base
        );

        Ok(Self {
            inner: Some(SessionInner {
                demuxer,
                decoder,
                stream_index,
                draining: false,
            }),
            info,
            missing_pts: 0,
        })
    }

    /// Resolution and time base of the selected video stream.
    pub fn stream_info(&self) -> StreamInfo {
        self.info
    }

    /// Number of decoded pictures that carried no valid PTS and were
    /// substituted with timestamp zero.
    pub fn missing_pts(&self) -> u64 {
        self.missing_pts
    }

    /// Pull the next decoded frame in stream order.
    ///
    /// Successive frames have non-decreasing timestamps, barring the
    /// documented missing-PTS substitution. After a terminal outcome this
    /// deterministically returns `NextFrame::EndOfStream`.
    pub fn next_frame(&mut self) -> Result<NextFrame, DecodeError> {
        let Some(inner) = self.inner.as_mut() else {
            return Ok(NextFrame::EndOfStream);
        };

        match inner.pull(&mut self.missing_pts) {
            Ok(Some(frame)) => Ok(NextFrame::Frame(frame)),
            Ok(None) => {
                self.close();
                Ok(NextFrame::EndOfStream)
            }
            Err(err) => {
                warn!("DecodeSession: terminal decode failure: {}", err);
                self.close();
                Err(err)
            }
        }
    }

    /// Release all session resources. Idempotent; safe after end of stream,
    /// after a decode error, and after a previous close.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            info!("DecodeSession: closed");
        }
    }
}

impl Drop for DecodeSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl FrameSource for DecodeSession {
    fn next_frame(&mut self) -> Result<NextFrame, DecodeError> {
        DecodeSession::next_frame(self)
    }
}

impl SessionInner {
    /// Drain-then-feed loop: take a decoded picture if one is buffered,
    /// otherwise read packets until the decoder produces one. `Ok(None)`
    /// means the stream is exhausted.
    fn pull(&mut self, missing_pts: &mut u64) -> Result<Option<DecodedFrame>, DecodeError> {
        let mut packets_read = 0usize;

        loop {
            match self.decoder.take() {
                Ok(Some(frame)) => return frame_from_decoded(&frame, missing_pts).map(Some),
                Ok(None) if self.draining => return Ok(None),
                Ok(None) => {}
                Err(err) => return Err(DecodeError::Codec(err.to_string())),
            }

            if packets_read >= MAX_PACKET_READS_PER_FRAME {
                return Err(DecodeError::StreamStalled {
                    packets: packets_read,
                });
            }

            // A failed read is distinct from end of input: the demuxer
            // reports exhaustion as an empty take, never as an error.
            match self.demuxer.take() {
                Ok(Some(packet)) => {
                    packets_read += 1;
                    if packet.stream_index() != self.stream_index {
                        continue;
                    }
                    self.decoder
                        .push(packet)
                        .map_err(|err| DecodeError::Codec(err.to_string()))?;
                }
                Ok(None) => {
                    self.decoder
                        .flush()
                        .map_err(|err| DecodeError::Codec(err.to_string()))?;
                    self.draining = true;
                }
                Err(err) => return Err(DecodeError::Read(err.to_string())),
            }
        }
    }
}

/// Copy one decoded picture out of the decoder's reusable buffer.
fn frame_from_decoded(
    frame: &video::VideoFrame,
    missing_pts: &mut u64,
) -> Result<DecodedFrame, DecodeError> {
    if frame.pixel_format() != video::frame::get_pixel_format("yuv420p") {
        return Err(DecodeError::UnsupportedPixelFormat);
    }

    let width = frame.width();
    let height = frame.height();
    let chroma_w = width.div_ceil(2);
    let chroma_h = height.div_ceil(2);

    let pts = match frame.pts().as_micros() {
        Some(micros) => Timestamp::from_micros(micros),
        None => {
            // Degraded but non-fatal: downstream sync loses one frame's
            // precision instead of playback aborting.
            *missing_pts += 1;
            warn!("DecodeSession: decoded frame has no valid PTS, using 0");
            Timestamp::ZERO
        }
    };

    let planes = frame.planes();
    let dims = [(width, height), (chroma_w, chroma_h), (chroma_w, chroma_h)];

    let [y, u, v] = [0usize, 1, 2].map(|i| {
        let (w, h) = dims[i];
        FramePlane {
            data: Bytes::copy_from_slice(planes[i].data()),
            stride: planes[i].line_size(),
            width: w,
            height: h,
        }
    });

    Ok(DecodedFrame::new(width, height, pts, [y, u, v]))
}
