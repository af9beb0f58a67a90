/// Ray with normalized direction, used by octree ray queries and picking.

use glam::Vec3;
use super::{BoundingBox, Sphere};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray; `direction` is normalized (a zero vector stays zero)
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction: direction.normalize_or_zero() }
    }

    pub fn point_at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }

    /// Project a point onto the ray line
    pub fn project(&self, point: Vec3) -> Vec3 {
        self.origin + self.direction * (point - self.origin).dot(self.direction)
    }

    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        (point - self.project(point)).length()
    }

    /// Distance to the box surface, zero if the origin is inside,
    /// `f32::INFINITY` if the box is missed or undefined.
    pub fn hit_distance_box(&self, bounds: &BoundingBox) -> f32 {
        if !bounds.is_defined() {
            return f32::INFINITY;
        }
        if bounds.is_inside_point(self.origin) == super::Intersection::Inside {
            return 0.0;
        }

        let mut t_min = 0.0f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let origin = self.origin[axis];
            let direction = self.direction[axis];
            if direction.abs() < f32::EPSILON {
                if origin < bounds.min[axis] || origin > bounds.max[axis] {
                    return f32::INFINITY;
                }
                continue;
            }
            let inv = 1.0 / direction;
            let mut t0 = (bounds.min[axis] - origin) * inv;
            let mut t1 = (bounds.max[axis] - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return f32::INFINITY;
            }
        }
        t_min
    }

    pub fn hit_distance_sphere(&self, sphere: &Sphere) -> f32 {
        let centered = self.origin - sphere.center;
        let radius_squared = sphere.radius * sphere.radius;
        if centered.length_squared() <= radius_squared {
            return 0.0;
        }

        let b = 2.0 * centered.dot(self.direction);
        let c = centered.length_squared() - radius_squared;
        let discriminant = b * b - 4.0 * c;
        if discriminant < 0.0 {
            return f32::INFINITY;
        }
        let t = (-b - discriminant.sqrt()) * 0.5;
        if t >= 0.0 { t } else { f32::INFINITY }
    }

    /// Two-sided ray/triangle distance (Moller-Trumbore). Returns the hit
    /// distance and the geometric normal facing the ray origin.
    pub fn hit_distance_triangle(&self, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<(f32, Vec3)> {
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < f32::EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let t_vec = self.origin - v0;
        let u = t_vec.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = t_vec.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        let distance = edge2.dot(q) * inv_det;
        if distance < 0.0 {
            return None;
        }

        let mut normal = edge1.cross(edge2).normalize_or_zero();
        if normal.dot(self.direction) > 0.0 {
            normal = -normal;
        }
        Some((distance, normal))
    }
}

#[cfg(test)]
#[path = "ray_tests.rs"]
mod tests;
