//! Frame - stream output
//!
//! Raw frame captured by a depth or color stream.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Bytes per depth sample (little-endian u16)
pub const DEPTH_BYTES_PER_PIXEL: usize = 2;

/// Bytes per color pixel (packed RGB888)
pub const COLOR_BYTES_PER_PIXEL: usize = 3;

/// Raw depth sample meaning "no measurement"
pub const INVALID_DEPTH_SAMPLE: u16 = 0;

/// Sensor stream kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Depth,
    Color,
}

impl StreamKind {
    /// Stable label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Depth => "depth",
            StreamKind::Color => "color",
        }
    }

    /// Payload bytes per pixel for this stream
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            StreamKind::Depth => DEPTH_BYTES_PER_PIXEL,
            StreamKind::Color => COLOR_BYTES_PER_PIXEL,
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution and rate of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMode {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl VideoMode {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self { width, height, fps }
    }

    /// Number of pixels per frame
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for VideoMode {
    fn default() -> Self {
        Self::new(640, 480, 30)
    }
}

/// A single frame received from a stream
///
/// Immutable once received. Ownership moves from the stream's channel to the
/// pending queue and finally to the synchronizer.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Stream that produced the frame
    pub stream: StreamKind,

    /// Per-stream frame index (monotonically increasing)
    pub index: u64,

    /// Frame width in pixels
    pub width: u32,

    /// Frame height in pixels
    pub height: u32,

    /// Device timestamp (microseconds), diagnostics only
    pub timestamp_us: u64,

    /// Raw pixel payload (zero-copy)
    pub payload: Bytes,
}

impl Frame {
    /// Build a depth frame from row-major samples
    pub fn depth(index: u64, width: u32, height: u32, samples: &[u16]) -> Self {
        let mut payload = Vec::with_capacity(samples.len() * DEPTH_BYTES_PER_PIXEL);
        for sample in samples {
            payload.extend_from_slice(&sample.to_le_bytes());
        }
        Self {
            stream: StreamKind::Depth,
            index,
            width,
            height,
            timestamp_us: 0,
            payload: Bytes::from(payload),
        }
    }

    /// Build a color frame from packed RGB bytes
    pub fn color(index: u64, width: u32, height: u32, rgb: impl Into<Bytes>) -> Self {
        Self {
            stream: StreamKind::Color,
            index,
            width,
            height,
            timestamp_us: 0,
            payload: rgb.into(),
        }
    }

    /// Attach a device timestamp
    pub fn with_timestamp_us(mut self, timestamp_us: u64) -> Self {
        self.timestamp_us = timestamp_us;
        self
    }

    /// Number of pixels described by width x height
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Payload length implied by the frame geometry
    pub fn expected_payload_len(&self) -> usize {
        self.pixel_count() * self.stream.bytes_per_pixel()
    }

    /// Check that the payload length matches the frame geometry
    pub fn validate_payload(&self) -> Result<(), ContractError> {
        let expected = self.expected_payload_len();
        if self.payload.len() != expected {
            return Err(ContractError::PayloadSize {
                stream: self.stream,
                index: self.index,
                expected,
                actual: self.payload.len(),
            });
        }
        Ok(())
    }

    /// Iterate depth samples in row-major order
    ///
    /// Only meaningful for depth frames; a trailing odd byte is ignored.
    pub fn depth_samples(&self) -> impl Iterator<Item = u16> + '_ {
        self.payload
            .chunks_exact(DEPTH_BYTES_PER_PIXEL)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_frame_encoding() {
        let frame = Frame::depth(7, 2, 1, &[0x0102, 0xfffe]);
        assert_eq!(frame.stream, StreamKind::Depth);
        assert_eq!(frame.payload.as_ref(), &[0x02, 0x01, 0xfe, 0xff]);
        assert_eq!(frame.depth_samples().collect::<Vec<_>>(), vec![0x0102, 0xfffe]);
        assert!(frame.validate_payload().is_ok());
    }

    #[test]
    fn test_color_payload_validation() {
        let frame = Frame::color(1, 2, 2, vec![0u8; 11]);
        match frame.validate_payload() {
            Err(ContractError::PayloadSize {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 12);
                assert_eq!(actual, 11);
            }
            other => panic!("expected PayloadSize, got {other:?}"),
        }
    }

    #[test]
    fn test_stream_kind_serde() {
        let json = serde_json::to_string(&StreamKind::Depth).unwrap();
        assert_eq!(json, "\"depth\"");
        assert_eq!(StreamKind::Color.to_string(), "color");
    }
}
