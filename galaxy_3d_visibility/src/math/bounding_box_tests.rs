use glam::{Mat4, Quat, Vec3};
use super::*;
use crate::math::{Intersection, Sphere};

fn unit_box() -> BoundingBox {
    BoundingBox::new(Vec3::splat(-1.0), Vec3::splat(1.0))
}

// ============================================================================
// Definition and merging
// ============================================================================

#[test]
fn test_undefined_box() {
    let bounds = BoundingBox::UNDEFINED;
    assert!(!bounds.is_defined());
    assert!(!bounds.is_valid());
    assert_eq!(BoundingBox::default(), BoundingBox::UNDEFINED);
}

#[test]
fn test_merge_point_defines_box() {
    let mut bounds = BoundingBox::UNDEFINED;
    bounds.merge_point(Vec3::new(1.0, 2.0, 3.0));
    assert!(bounds.is_defined());
    assert!(!bounds.is_valid(), "a single point has no extent");

    bounds.merge_point(Vec3::new(-1.0, 0.0, 5.0));
    assert_eq!(bounds.min, Vec3::new(-1.0, 0.0, 3.0));
    assert_eq!(bounds.max, Vec3::new(1.0, 2.0, 5.0));
    assert!(bounds.is_valid());
}

#[test]
fn test_merge_ignores_undefined() {
    let mut bounds = unit_box();
    bounds.merge(&BoundingBox::UNDEFINED);
    assert_eq!(bounds, unit_box());
}

#[test]
fn test_flat_box_is_valid() {
    let plane = BoundingBox::new(Vec3::new(-5.0, 0.0, -5.0), Vec3::new(5.0, 0.0, 5.0));
    assert!(plane.is_valid());
}

#[test]
fn test_intersection_of_disjoint_boxes_is_undefined() {
    let a = unit_box();
    let b = BoundingBox::new(Vec3::splat(2.0), Vec3::splat(3.0));
    assert!(!a.intersection(&b).is_defined());
}

// ============================================================================
// Transform
// ============================================================================

#[test]
fn test_transformed_translation() {
    let moved = unit_box().transformed(&Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)));
    assert_eq!(moved.min, Vec3::new(9.0, -1.0, -1.0));
    assert_eq!(moved.max, Vec3::new(11.0, 1.0, 1.0));
}

#[test]
fn test_transformed_rotation_grows_box() {
    let rotated = unit_box().transformed(&Mat4::from_quat(Quat::from_rotation_y(std::f32::consts::FRAC_PI_4)));
    let expected = 2.0f32.sqrt();
    assert!((rotated.max.x - expected).abs() < 1e-5);
    assert!((rotated.max.y - 1.0).abs() < 1e-5);
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_is_inside_box() {
    let outer = BoundingBox::from_extent(10.0);
    assert_eq!(outer.is_inside_box(&unit_box()), Intersection::Inside);

    let straddling = BoundingBox::new(Vec3::splat(9.0), Vec3::splat(11.0));
    assert_eq!(outer.is_inside_box(&straddling), Intersection::Intersects);
    assert_eq!(outer.is_inside_box_fast(&straddling), Intersection::Inside);

    let far = BoundingBox::new(Vec3::splat(20.0), Vec3::splat(21.0));
    assert_eq!(outer.is_inside_box(&far), Intersection::Outside);
}

#[test]
fn test_is_inside_point() {
    assert_eq!(unit_box().is_inside_point(Vec3::ZERO), Intersection::Inside);
    assert_eq!(unit_box().is_inside_point(Vec3::new(0.0, 1.5, 0.0)), Intersection::Outside);
}

#[test]
fn test_is_inside_sphere() {
    let outer = BoundingBox::from_extent(10.0);
    assert_eq!(outer.is_inside_sphere(&Sphere::new(Vec3::ZERO, 1.0)), Intersection::Inside);
    assert_eq!(outer.is_inside_sphere(&Sphere::new(Vec3::new(10.0, 0.0, 0.0), 1.0)), Intersection::Intersects);
    assert_eq!(outer.is_inside_sphere(&Sphere::new(Vec3::new(20.0, 0.0, 0.0), 1.0)), Intersection::Outside);
}

#[test]
fn test_distance_to_point() {
    assert_eq!(unit_box().distance_to_point(Vec3::ZERO), 0.0);
    assert!((unit_box().distance_to_point(Vec3::new(4.0, 0.0, 0.0)) - 3.0).abs() < 1e-6);
}

// ============================================================================
// Projection
// ============================================================================

#[test]
fn test_projected_box_in_front_of_camera() {
    let projection = Mat4::perspective_rh(90f32.to_radians(), 1.0, 0.1, 100.0);
    let bounds = BoundingBox::new(Vec3::new(-1.0, -1.0, -11.0), Vec3::new(1.0, 1.0, -9.0));
    let rect = bounds.projected(&projection);

    assert!(rect.is_defined());
    // The near face at depth 9 is the widest part of the projection
    assert!((rect.max.x - 1.0 / 9.0).abs() < 1e-4);
    assert!((rect.min.y + 1.0 / 9.0).abs() < 1e-4);
}

#[test]
fn test_projected_box_behind_camera_is_clamped() {
    let projection = Mat4::perspective_rh(90f32.to_radians(), 1.0, 0.1, 100.0);
    let bounds = BoundingBox::new(Vec3::new(-1.0, -1.0, -5.0), Vec3::new(1.0, 1.0, 5.0));
    let rect = bounds.projected(&projection);

    assert!(rect.is_defined());
    assert!(rect.size().x > 2.0);
    assert!(rect.min.x.is_finite() && rect.max.x.is_finite());
}

#[test]
fn test_sphere_from_points() {
    let sphere = Sphere::from_points(&[Vec3::new(-2.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)]);
    assert!((sphere.center - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-6);
    assert!((sphere.radius - (4.0f32 + 0.25).sqrt()).abs() < 1e-5);
    assert_eq!(Sphere::from_points(&[]).radius, 0.0);
}
