//! Depth-to-world conversion and color copy.
//!
//! Both write into preallocated buffers and refuse frames whose geometry does
//! not match the buffer instead of resizing it.

use contracts::{
    invalid_point, BoundingBox, ContractError, ConverterConfig, Frame, PointGrid, StreamKind,
    WorldPoint, DEPTH_BYTES_PER_PIXEL, INVALID_DEPTH_SAMPLE,
};
use image::RgbImage;

/// Maps a depth pixel to a world-space point
///
/// Implementations carry the stream context (resolution, intrinsics) and
/// must be pure: the same input always yields the same point.
pub trait DepthToWorld: Send + Sync {
    fn depth_to_world(&self, x: u32, y: u32, raw: u16) -> WorldPoint;
}

/// Field-of-view projection for a pinhole depth camera
#[derive(Debug, Clone, PartialEq)]
pub struct FovConverter {
    x_res: f32,
    y_res: f32,
    x_scale: f32,
    y_scale: f32,
    depth_unit_m: f32,
}

impl FovConverter {
    pub fn new(width: u32, height: u32, config: &ConverterConfig) -> Self {
        let half_h = config.horizontal_fov_deg.to_radians() / 2.0;
        let half_v = config.vertical_fov_deg.to_radians() / 2.0;
        Self {
            x_res: width.max(1) as f32,
            y_res: height.max(1) as f32,
            x_scale: half_h.tan() * 2.0,
            y_scale: half_v.tan() * 2.0,
            depth_unit_m: config.depth_unit_m,
        }
    }
}

impl DepthToWorld for FovConverter {
    #[inline]
    fn depth_to_world(&self, x: u32, y: u32, raw: u16) -> WorldPoint {
        if raw == INVALID_DEPTH_SAMPLE {
            return invalid_point();
        }
        let z = f32::from(raw) * self.depth_unit_m;
        let nx = x as f32 / self.x_res - 0.5;
        let ny = 0.5 - y as f32 / self.y_res;
        WorldPoint::new(nx * z * self.x_scale, ny * z * self.y_scale, z)
    }
}

/// Check that `frame` fits a `width x height` buffer
pub fn check_frame(frame: &Frame, width: u32, height: u32) -> Result<(), ContractError> {
    if (frame.width, frame.height) != (width, height) {
        return Err(ContractError::DimensionMismatch {
            stream: frame.stream,
            index: frame.index,
            width: frame.width,
            height: frame.height,
            expected_width: width,
            expected_height: height,
        });
    }
    frame.validate_payload()
}

/// Convert a depth frame into `grid` in place
pub fn convert_depth_frame(
    frame: &Frame,
    converter: &dyn DepthToWorld,
    grid: &mut PointGrid,
) -> Result<(), ContractError> {
    debug_assert_eq!(frame.stream, StreamKind::Depth);
    let (width, height) = grid.dimensions();
    check_frame(frame, width, height)?;
    if width == 0 {
        return Ok(());
    }

    let row_bytes = width as usize * DEPTH_BYTES_PER_PIXEL;
    let rows = grid.points_mut().chunks_exact_mut(width as usize);
    for ((y, row), samples) in rows.enumerate().zip(frame.payload.chunks_exact(row_bytes)) {
        for ((x, point), raw) in row.iter_mut().enumerate().zip(samples.chunks_exact(2)) {
            let raw = u16::from_le_bytes([raw[0], raw[1]]);
            *point = converter.depth_to_world(x as u32, y as u32, raw);
        }
    }
    Ok(())
}

/// Copy a color frame into `image` in place
pub fn convert_color_frame(frame: &Frame, image: &mut RgbImage) -> Result<(), ContractError> {
    debug_assert_eq!(frame.stream, StreamKind::Color);
    let (width, height) = image.dimensions();
    check_frame(frame, width, height)?;
    image.copy_from_slice(&frame.payload);
    Ok(())
}

/// Bounding box of the valid points of a depth frame
pub fn compute_frame_bbox(frame: &Frame, converter: &dyn DepthToWorld) -> BoundingBox {
    let width = frame.width.max(1);
    frame
        .depth_samples()
        .enumerate()
        .map(|(i, raw)| {
            let x = i as u32 % width;
            let y = i as u32 / width;
            converter.depth_to_world(x, y, raw)
        })
        .fold(BoundingBox::empty(), |mut bbox, p| {
            bbox.extend(&p);
            bbox
        })
}
