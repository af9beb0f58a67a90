/// Bounding sphere used by point-light queries.

use glam::Vec3;
use super::{BoundingBox, Intersection};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Sphere around the bounds center reaching the farthest point
    pub fn from_points(points: &[Vec3]) -> Self {
        if points.is_empty() {
            return Self::new(Vec3::ZERO, 0.0);
        }
        let center = BoundingBox::from_points(points).center();
        let radius = points
            .iter()
            .map(|point| (*point - center).length())
            .fold(0.0_f32, f32::max);
        Self { center, radius }
    }

    pub fn is_inside_point(&self, point: Vec3) -> Intersection {
        if (point - self.center).length_squared() < self.radius * self.radius {
            Intersection::Inside
        } else {
            Intersection::Outside
        }
    }

    /// Classify a box against this sphere
    pub fn is_inside_box(&self, bounds: &BoundingBox) -> Intersection {
        let radius_squared = self.radius * self.radius;
        if bounds.distance_to_point(self.center).powi(2) >= radius_squared {
            return Intersection::Outside;
        }

        let all_corners_inside = bounds
            .corners()
            .iter()
            .all(|corner| (*corner - self.center).length_squared() < radius_squared);
        if all_corners_inside {
            Intersection::Inside
        } else {
            Intersection::Intersects
        }
    }

    /// Like `is_inside_box` but never reports `Intersects`
    pub fn is_inside_box_fast(&self, bounds: &BoundingBox) -> Intersection {
        if bounds.distance_to_point(self.center).powi(2) >= self.radius * self.radius {
            Intersection::Outside
        } else {
            Intersection::Inside
        }
    }
}
