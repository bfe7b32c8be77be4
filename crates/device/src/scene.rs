//! Synthetic scene rendered by the mock streams.
//!
//! A slowly moving wave over a back wall at ~1.5 m, with an invalid
//! two-pixel border as produced by real structured-light sensors.

use bytes::Bytes;
use contracts::{INVALID_DEPTH_SAMPLE, VideoMode};

const WALL_DEPTH_MM: f32 = 1500.0;
const WAVE_AMPLITUDE_MM: f32 = 250.0;
const INVALID_BORDER_PX: u32 = 2;

/// Raw depth sample (millimeters) at pixel (x, y) for frame `index`
pub fn depth_sample(mode: &VideoMode, x: u32, y: u32, index: u64) -> u16 {
    if x < INVALID_BORDER_PX || x + INVALID_BORDER_PX >= mode.width {
        return INVALID_DEPTH_SAMPLE;
    }
    let phase = (index % 360) as f32 * std::f32::consts::PI / 180.0;
    let u = x as f32 / mode.width as f32 * std::f32::consts::TAU;
    let v = y as f32 / mode.height as f32 * std::f32::consts::PI;
    let depth = WALL_DEPTH_MM + WAVE_AMPLITUDE_MM * (u + phase).sin() * v.sin();
    depth.round() as u16
}

/// Little-endian depth payload for frame `index`
pub fn depth_payload(mode: &VideoMode, index: u64) -> Bytes {
    let mut payload = Vec::with_capacity(mode.pixel_count() * 2);
    for y in 0..mode.height {
        for x in 0..mode.width {
            payload.extend_from_slice(&depth_sample(mode, x, y, index).to_le_bytes());
        }
    }
    Bytes::from(payload)
}

/// Packed RGB payload for frame `index`
pub fn color_payload(mode: &VideoMode, index: u64) -> Bytes {
    let mut payload = Vec::with_capacity(mode.pixel_count() * 3);
    let blue = (index % 256) as u8;
    for y in 0..mode.height {
        let green = (y * 255 / mode.height.max(1)) as u8;
        for x in 0..mode.width {
            let red = (x * 255 / mode.width.max(1)) as u8;
            payload.extend_from_slice(&[red, green, blue]);
        }
    }
    Bytes::from(payload)
}
