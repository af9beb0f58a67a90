//! Math module: bounding volumes, planes, frusta, rays and convex polyhedra.
//!
//! Everything is expressed with `glam` types in a right-handed world
//! (cameras look down -Z, clip-space depth in 0..1).

mod bounding_box;
mod frustum;
mod polyhedron;
mod ray;
mod rect;
mod sphere;

pub use bounding_box::BoundingBox;
pub use frustum::{
    Frustum, Plane,
    PLANE_NEAR, PLANE_LEFT, PLANE_RIGHT, PLANE_UP, PLANE_DOWN, PLANE_FAR,
};
pub use polyhedron::Polyhedron;
pub use ray::Ray;
pub use rect::{IntRect, Rect};
pub use sphere::Sphere;

/// Large finite value standing in for "unbounded" extents
pub const LARGE_VALUE: f32 = 100_000_000.0;

/// Tolerance used by geometric comparisons
pub const EPSILON: f32 = 0.000001;

/// Result of classifying one volume against another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersection {
    /// Fully outside
    Outside,
    /// Partially overlapping
    Intersects,
    /// Fully inside
    Inside,
}

/// Rotation turning the -Z axis towards `direction`
pub fn look_rotation(direction: glam::Vec3, up_hint: glam::Vec3) -> glam::Quat {
    use glam::{Mat3, Quat, Vec3};

    let forward = direction.normalize_or_zero();
    if forward == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let up_hint = if forward.cross(up_hint).length_squared() < EPSILON {
        if forward.y.abs() > 0.9 { Vec3::Z } else { Vec3::Y }
    } else {
        up_hint
    };
    let right = forward.cross(up_hint).normalize();
    let up = right.cross(forward);
    Quat::from_mat3(&Mat3::from_cols(right, up, -forward)).normalize()
}
