use glam::{Mat4, Vec3};
use super::*;
use crate::math::{BoundingBox, Intersection, Sphere};

fn camera_frustum() -> Frustum {
    // Camera at +5 on Z looking at the origin
    let projection = Mat4::perspective_rh(std::f32::consts::FRAC_PI_4, 16.0 / 9.0, 0.1, 100.0);
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    Frustum::from_view_projection(&(projection * view))
}

fn small_box(center: Vec3) -> BoundingBox {
    BoundingBox::from_center_half_size(center, Vec3::splat(0.5))
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_planes_are_normalized() {
    for plane in &camera_frustum().planes {
        assert!((plane.normal.length() - 1.0).abs() < 1e-4);
    }
}

#[test]
fn test_vertices_lie_on_near_and_far_planes() {
    let frustum = camera_frustum();
    for vertex in &frustum.vertices[0..4] {
        assert!(frustum.planes[PLANE_NEAR].distance(*vertex).abs() < 1e-3);
    }
    for vertex in &frustum.vertices[4..8] {
        assert!(frustum.planes[PLANE_FAR].distance(*vertex).abs() < 0.05);
    }
}

#[test]
fn test_perspective_matches_view_projection() {
    let transform = Mat4::from_translation(Vec3::new(0.0, 0.0, 5.0));
    let built = Frustum::from_perspective(45.0, 16.0 / 9.0, 1.0, 0.1, 100.0, &transform);
    let extracted = camera_frustum();

    for (a, b) in built.vertices.iter().zip(extracted.vertices.iter()) {
        assert!((*a - *b).length() < 0.05, "{:?} vs {:?}", a, b);
    }
}

#[test]
fn test_orthographic_extents() {
    let frustum = Frustum::from_orthographic(10.0, 2.0, 1.0, 0.0, 50.0, &Mat4::IDENTITY);
    let bounds = frustum.bounding_box();
    assert!((bounds.min.x + 10.0).abs() < 1e-5);
    assert!((bounds.max.y - 5.0).abs() < 1e-5);
    assert!((bounds.min.z + 50.0).abs() < 1e-5);
    assert!(bounds.max.z.abs() < 1e-5);
}

#[test]
fn test_mirrored_transform_keeps_planes_inward() {
    let mirror = Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0));
    let frustum = Frustum::from_perspective(60.0, 1.0, 1.0, 1.0, 20.0, &Mat4::IDENTITY).transformed(&mirror);
    assert_eq!(frustum.is_inside_point(Vec3::new(0.0, 0.0, -10.0)), Intersection::Inside);
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_box_in_front_is_inside() {
    assert_eq!(camera_frustum().is_inside_box(&small_box(Vec3::ZERO)), Intersection::Inside);
}

#[test]
fn test_box_behind_is_outside() {
    let frustum = camera_frustum();
    let behind = small_box(Vec3::new(0.0, 0.0, 20.0));
    assert_eq!(frustum.is_inside_box(&behind), Intersection::Outside);
    assert_eq!(frustum.is_inside_box_fast(&behind), Intersection::Outside);
}

#[test]
fn test_box_straddling_is_intersecting() {
    let huge = BoundingBox::from_extent(1000.0);
    assert_eq!(camera_frustum().is_inside_box(&huge), Intersection::Intersects);
    assert_eq!(camera_frustum().is_inside_box_fast(&huge), Intersection::Inside);
}

#[test]
fn test_sphere_classification() {
    let frustum = camera_frustum();
    assert_eq!(frustum.is_inside_sphere(&Sphere::new(Vec3::ZERO, 0.5)), Intersection::Inside);
    assert_eq!(frustum.is_inside_sphere(&Sphere::new(Vec3::new(0.0, 0.0, 50.0), 1.0)), Intersection::Outside);
    assert_eq!(frustum.is_inside_sphere(&Sphere::new(Vec3::new(0.0, 0.0, 5.0), 1.0)), Intersection::Intersects);
}
