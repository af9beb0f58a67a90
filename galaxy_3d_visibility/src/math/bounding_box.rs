/// Axis-aligned bounding box with an explicit undefined state.
///
/// An undefined box has `min = +inf` and `max = -inf`, so merging a point or
/// another box into it simply adopts that extent.

use glam::{Mat4, Vec3};
use super::{Intersection, Rect, Sphere};

/// View depth corners are clamped to before projecting
const MIN_PROJECTED_DEPTH: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

impl BoundingBox {
    /// Box with no extent; merging anything into it defines it
    pub const UNDEFINED: BoundingBox = BoundingBox {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Cube spanning `-extent..extent` on every axis
    pub fn from_extent(extent: f32) -> Self {
        Self::new(Vec3::splat(-extent), Vec3::splat(extent))
    }

    pub fn from_center_half_size(center: Vec3, half_size: Vec3) -> Self {
        Self::new(center - half_size, center + half_size)
    }

    /// Smallest box enclosing all points (undefined when empty)
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut bounds = Self::UNDEFINED;
        for point in points {
            bounds.merge_point(*point);
        }
        bounds
    }

    /// True once at least one point has been merged and no component is NaN
    pub fn is_defined(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Defined and with a non-zero extent on at least one axis
    pub fn is_valid(&self) -> bool {
        self.is_defined() && self.size().max_element() > 0.0
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn half_size(&self) -> Vec3 {
        self.size() * 0.5
    }

    pub fn merge_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn merge(&mut self, other: &BoundingBox) {
        if other.is_defined() {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }

    /// Box grown by `amount` on every side
    pub fn expanded(&self, amount: Vec3) -> Self {
        Self::new(self.min - amount, self.max + amount)
    }

    /// Clip this box to `other`; the result may be undefined if they are disjoint
    pub fn intersection(&self, other: &BoundingBox) -> Self {
        Self::new(self.min.max(other.min), self.max.min(other.max))
    }

    /// Transform by an affine matrix.
    ///
    /// Projects each matrix axis onto the box extents (Arvo) instead of
    /// transforming the eight corners.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        if !self.is_defined() {
            return *self;
        }

        let translation = matrix.col(3).truncate();
        let mut new_min = translation;
        let mut new_max = translation;

        for i in 0..3 {
            let axis = matrix.col(i).truncate();
            let a = axis * self.min[i];
            let b = axis * self.max[i];
            new_min += a.min(b);
            new_max += a.max(b);
        }

        Self::new(new_min, new_max)
    }

    pub fn corners(&self) -> [Vec3; 8] {
        [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ]
    }

    pub fn is_inside_point(&self, point: Vec3) -> Intersection {
        if point.cmplt(self.min).any() || point.cmpgt(self.max).any() {
            Intersection::Outside
        } else {
            Intersection::Inside
        }
    }

    /// Classify `other` against this box
    pub fn is_inside_box(&self, other: &BoundingBox) -> Intersection {
        if other.max.cmplt(self.min).any() || other.min.cmpgt(self.max).any() {
            Intersection::Outside
        } else if other.min.cmplt(self.min).any() || other.max.cmpgt(self.max).any() {
            Intersection::Intersects
        } else {
            Intersection::Inside
        }
    }

    /// Like `is_inside_box` but never reports `Intersects`
    pub fn is_inside_box_fast(&self, other: &BoundingBox) -> Intersection {
        if other.max.cmplt(self.min).any() || other.min.cmpgt(self.max).any() {
            Intersection::Outside
        } else {
            Intersection::Inside
        }
    }

    /// Classify a sphere against this box
    pub fn is_inside_sphere(&self, sphere: &Sphere) -> Intersection {
        let closest = sphere.center.clamp(self.min, self.max);
        let dist_squared = (closest - sphere.center).length_squared();
        let radius_squared = sphere.radius * sphere.radius;

        if dist_squared >= radius_squared {
            return Intersection::Outside;
        }

        let radius = Vec3::splat(sphere.radius);
        if (sphere.center - radius).cmplt(self.min).any() || (sphere.center + radius).cmpgt(self.max).any() {
            Intersection::Intersects
        } else {
            Intersection::Inside
        }
    }

    /// Screen-space rectangle covered by a view-space box.
    ///
    /// Depth is clamped to stay in front of the near plane before the
    /// corners are projected, so boxes crossing the camera still project.
    pub fn projected(&self, projection: &Mat4) -> Rect {
        let mut bounds = *self;
        bounds.min.z = bounds.min.z.min(-MIN_PROJECTED_DEPTH);
        bounds.max.z = bounds.max.z.min(-MIN_PROJECTED_DEPTH);

        let mut rect = Rect::UNDEFINED;
        for corner in bounds.corners() {
            let projected = projection.project_point3(corner);
            rect.merge_point(projected.truncate());
        }
        rect
    }

    /// Distance along each axis from the box surface (zero when inside)
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        let offset = (self.min - point).max(Vec3::ZERO).max(point - self.max);
        offset.length()
    }
}

#[cfg(test)]
#[path = "bounding_box_tests.rs"]
mod tests;
