use glam::{Mat4, Vec3};
use super::*;
use crate::math::{BoundingBox, Frustum};

#[test]
fn test_from_frustum_bounds_match_frustum() {
    let frustum = Frustum::from_perspective(60.0, 1.0, 1.0, 1.0, 10.0, &Mat4::IDENTITY);
    let polyhedron = Polyhedron::from_frustum(&frustum);
    assert_eq!(polyhedron.faces.len(), 6);
    assert_eq!(polyhedron.bounding_box(), frustum.bounding_box());
}

#[test]
fn test_clip_box_keeps_overlap() {
    let mut polyhedron = Polyhedron::from_box(&BoundingBox::from_extent(10.0));
    polyhedron.clip_box(&BoundingBox::new(Vec3::new(0.0, -20.0, -20.0), Vec3::new(5.0, 20.0, 20.0)));

    let bounds = polyhedron.bounding_box();
    assert!((bounds.min.x - 0.0).abs() < 1e-4);
    assert!((bounds.max.x - 5.0).abs() < 1e-4);
    assert!((bounds.min.y + 10.0).abs() < 1e-4);
    assert!((bounds.max.z - 10.0).abs() < 1e-4);
}

#[test]
fn test_clip_disjoint_box_empties() {
    let mut polyhedron = Polyhedron::from_box(&BoundingBox::from_extent(1.0));
    polyhedron.clip_box(&BoundingBox::new(Vec3::splat(5.0), Vec3::splat(6.0)));
    assert!(polyhedron.is_empty());
    assert!(!polyhedron.bounding_box().is_defined());
}

#[test]
fn test_clip_frustum_to_receiver_box() {
    // Long frustum clipped by a small receiver volume near the camera
    let frustum = Frustum::from_perspective(90.0, 1.0, 1.0, 0.5, 1000.0, &Mat4::IDENTITY);
    let mut polyhedron = Polyhedron::from_frustum(&frustum);
    polyhedron.clip_box(&BoundingBox::new(Vec3::new(-2.0, -2.0, -10.0), Vec3::new(2.0, 2.0, -5.0)));

    let bounds = polyhedron.bounding_box();
    assert!(bounds.min.z >= -10.0 - 1e-3);
    assert!(bounds.max.z <= -5.0 + 1e-3);
    assert!(bounds.max.x <= 2.0 + 1e-3);
}

#[test]
fn test_transformed() {
    let polyhedron = Polyhedron::from_box(&BoundingBox::from_extent(1.0));
    let moved = polyhedron.transformed(&Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0)));
    assert!((moved.bounding_box().center() - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-6);
}
