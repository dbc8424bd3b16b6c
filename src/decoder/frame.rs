//! Decoded frame value type
//!
//! One reconstructed picture in planar YUV 4:2:0: a full-resolution luma
//! plane and two chroma planes at half resolution in both axes. Every plane
//! keeps the byte stride the decoder emitted, which may exceed the plane
//! width due to alignment padding.

use bytes::Bytes;
use log::warn;

use crate::pipeline::Timestamp;

/// One pixel plane with its own byte stride.
#[derive(Debug, Clone)]
pub struct FramePlane {
    /// Plane bytes, `height * stride` long (stride padding included).
    pub data: Bytes,
    /// Bytes per row, `>= width`.
    pub stride: usize,
    /// Meaningful pixels per row.
    pub width: usize,
    /// Rows in this plane.
    pub height: usize,
}

impl FramePlane {
    /// Borrow the meaningful pixels of row `r`, without stride padding.
    pub fn row(&self, r: usize) -> &[u8] {
        let start = r * self.stride;
        &self.data[start..start + self.width]
    }
}

/// One decoded picture, exclusively owned by whoever received it last.
///
/// The plane bytes are copied out of the decoder's reusable picture buffer,
/// so the frame stays valid after the decode session moves on or closes.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub width: usize,
    pub height: usize,
    /// Presentation timestamp converted from stream time-base ticks.
    /// `Timestamp::ZERO` when the decoded picture carried no valid PTS.
    pub pts: Timestamp,
    planes: [FramePlane; 3],
}

impl DecodedFrame {
    pub fn new(width: usize, height: usize, pts: Timestamp, planes: [FramePlane; 3]) -> Self {
        Self {
            width,
            height,
            pts,
            planes,
        }
    }

    /// All three planes, luma first.
    pub fn planes(&self) -> &[FramePlane; 3] {
        &self.planes
    }

    pub fn luma(&self) -> &FramePlane {
        &self.planes[0]
    }

    pub fn chroma_u(&self) -> &FramePlane {
        &self.planes[1]
    }

    pub fn chroma_v(&self) -> &FramePlane {
        &self.planes[2]
    }

    /// Size of the stride-stripped Y+U+V layout.
    pub fn packed_size(&self) -> usize {
        self.planes.iter().map(|p| p.width * p.height).sum()
    }

    /// Pack the three planes contiguously (Y then U then V) with stride
    /// padding stripped, for sinks that want tightly packed yuv420p.
    pub fn packed_yuv420(&self) -> Vec<u8> {
        let mut dst = vec![0u8; self.packed_size()];
        let mut offset = 0;
        for plane in &self.planes {
            let len = plane.width * plane.height;
            extract_plane(&mut dst[offset..offset + len], plane);
            offset += len;
        }
        dst
    }
}

/// Copy a plane from padded source to contiguous destination.
///
/// Fast path: no padding, single memcpy. Fallback: row-by-row copy.
fn extract_plane(dst: &mut [u8], plane: &FramePlane) {
    let total_src = plane.height * plane.stride;

    if plane.stride == plane.width && plane.data.len() >= total_src {
        dst.copy_from_slice(&plane.data[..plane.width * plane.height]);
        return;
    }

    for r in 0..plane.height {
        let src_start = r * plane.stride;
        let dst_start = r * plane.width;
        if src_start + plane.width > plane.data.len() || dst_start + plane.width > dst.len() {
            // Violates the `height * stride` plane contract; the remaining
            // destination rows stay zeroed.
            warn!(
                "plane data truncated: {} of {} rows available ({} bytes, stride {})",
                r,
                plane.height,
                plane.data.len(),
                plane.stride
            );
            break;
        }
        dst[dst_start..dst_start + plane.width]
            .copy_from_slice(&plane.data[src_start..src_start + plane.width]);
    }
}
