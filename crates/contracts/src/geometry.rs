//! World-space geometry produced from depth frames.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point in world coordinates (meters)
pub type WorldPoint = Point3<f32>;

/// Sentinel for samples without a valid depth measurement
#[inline]
pub fn invalid_point() -> WorldPoint {
    Point3::new(f32::NAN, f32::NAN, f32::NAN)
}

/// Whether a point carries a usable coordinate
///
/// Renderers must skip points for which this returns false.
#[inline]
pub fn is_valid_point(p: &WorldPoint) -> bool {
    p.x.is_finite() && p.y.is_finite() && p.z.is_finite()
}

/// Row-major grid of world points, one per depth pixel
#[derive(Debug, Clone, PartialEq)]
pub struct PointGrid {
    width: u32,
    height: u32,
    points: Vec<WorldPoint>,
}

impl PointGrid {
    /// Allocate a grid filled with invalid points
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            points: vec![invalid_point(); width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Point at pixel (x, y)
    pub fn get(&self, x: u32, y: u32) -> Option<&WorldPoint> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.points.get(y as usize * self.width as usize + x as usize)
    }

    /// All points in row-major order
    pub fn points(&self) -> &[WorldPoint] {
        &self.points
    }

    /// Mutable access for in-place conversion; the length never changes
    pub fn points_mut(&mut self) -> &mut [WorldPoint] {
        &mut self.points
    }

    /// One row of points
    pub fn row(&self, y: u32) -> Option<&[WorldPoint]> {
        if y >= self.height {
            return None;
        }
        let w = self.width as usize;
        let start = y as usize * w;
        Some(&self.points[start..start + w])
    }

    /// Iterate points with a valid coordinate
    pub fn valid_points(&self) -> impl Iterator<Item = &WorldPoint> {
        self.points.iter().filter(|p| is_valid_point(p))
    }

    /// Reset every point to the invalid sentinel
    pub fn clear(&mut self) {
        self.points.fill(invalid_point());
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl BoundingBox {
    /// Empty box (min > max); extends to the first point added
    pub fn empty() -> Self {
        Self {
            min: [f32::INFINITY; 3],
            max: [f32::NEG_INFINITY; 3],
        }
    }

    /// Whether no point has been added yet
    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    /// Grow the box to contain `p`; invalid points are ignored
    pub fn extend(&mut self, p: &WorldPoint) {
        if !is_valid_point(p) {
            return;
        }
        let coords = [p.x, p.y, p.z];
        for (i, c) in coords.into_iter().enumerate() {
            self.min[i] = self.min[i].min(c);
            self.max[i] = self.max[i].max(c);
        }
    }

    pub fn min_point(&self) -> WorldPoint {
        Point3::from(self.min)
    }

    pub fn max_point(&self) -> WorldPoint {
        Point3::from(self.max)
    }

    /// Center of the box, `None` if empty
    pub fn center(&self) -> Option<WorldPoint> {
        if self.is_empty() {
            return None;
        }
        Some(nalgebra::center(&self.min_point(), &self.max_point()))
    }

    /// Edge lengths, `None` if empty
    pub fn extent(&self) -> Option<Vector3<f32>> {
        if self.is_empty() {
            return None;
        }
        Some(self.max_point() - self.min_point())
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a> FromIterator<&'a WorldPoint> for BoundingBox {
    fn from_iter<I: IntoIterator<Item = &'a WorldPoint>>(iter: I) -> Self {
        let mut bbox = Self::empty();
        for p in iter {
            bbox.extend(p);
        }
        bbox
    }
}
