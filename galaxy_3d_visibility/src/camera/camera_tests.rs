use glam::{Quat, Vec3};
use super::*;
use crate::math::{Intersection, PLANE_NEAR};

fn forward_camera() -> Camera {
    Camera::looking_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, 60.0, 1.0, 100.0)
}

// ============================================================================
// Construction / setters
// ============================================================================

#[test]
fn test_default_camera() {
    let camera = Camera::new();
    assert_eq!(camera.near_clip(), 0.1);
    assert_eq!(camera.far_clip(), 1000.0);
    assert_eq!(camera.fov(), 45.0);
    assert!(!camera.is_orthographic());
    assert_eq!(camera.view_mask(), u32::MAX);
}

#[test]
fn test_setters_clamp() {
    let mut camera = Camera::new();
    camera.set_near_clip(-5.0);
    assert_eq!(camera.near_clip(), MIN_NEAR_CLIP);
    camera.set_fov(500.0);
    assert_eq!(camera.fov(), MAX_FOV);
    camera.set_zoom(0.0);
    assert!(camera.zoom() > 0.0);
}

#[test]
fn test_orthographic_near_clip_is_zero() {
    let mut camera = Camera::new();
    camera.set_orthographic(true);
    assert_eq!(camera.near_clip(), 0.0);
}

#[test]
fn test_look_at_direction() {
    let camera = forward_camera();
    assert!((camera.direction() - Vec3::NEG_Z).length() < 1e-5);

    let mut down = Camera::new();
    down.set_direction(Vec3::NEG_Y);
    assert!((down.direction() - Vec3::NEG_Y).length() < 1e-5);
}

// ============================================================================
// Frustum
// ============================================================================

#[test]
fn test_frustum_contains_target() {
    let camera = forward_camera();
    assert_eq!(camera.frustum().is_inside_point(Vec3::ZERO), Intersection::Inside);
    assert_eq!(camera.frustum().is_inside_point(Vec3::new(0.0, 0.0, 20.0)), Intersection::Outside);
}

#[test]
fn test_split_frustum_range() {
    let camera = forward_camera();
    let split = camera.split_frustum(5.0, 15.0);
    // Point 8 units ahead of the camera is inside, 20 units ahead is not
    assert_eq!(split.is_inside_point(Vec3::new(0.0, 0.0, 2.0)), Intersection::Inside);
    assert_eq!(split.is_inside_point(Vec3::new(0.0, 0.0, -10.0)), Intersection::Outside);
    assert!((split.planes[PLANE_NEAR].distance(Vec3::new(0.0, 0.0, 5.0))).abs() < 1e-4);
}

#[test]
fn test_frustum_matches_projection() {
    let camera = forward_camera();
    let from_matrix = crate::math::Frustum::from_view_projection(&camera.view_projection());
    let built = camera.frustum();
    for (a, b) in from_matrix.vertices.iter().zip(built.vertices.iter()) {
        assert!((*a - *b).length() < 0.05);
    }
}

#[test]
fn test_zoom_narrows_view() {
    let mut camera = forward_camera();
    let wide = camera.half_view_size();
    camera.set_zoom(2.0);
    assert!((camera.half_view_size() - wide * 0.5).abs() < 1e-6);
}

// ============================================================================
// Distances
// ============================================================================

#[test]
fn test_distance_perspective_and_orthographic() {
    let mut camera = forward_camera();
    assert!((camera.distance(Vec3::new(3.0, 0.0, 6.0)) - 5.0).abs() < 1e-5);

    camera.set_orthographic(true);
    assert!((camera.distance(Vec3::new(3.0, 0.0, 6.0)) - 4.0).abs() < 1e-5);
}

#[test]
fn test_depth_is_positive_ahead() {
    let camera = forward_camera();
    assert!((camera.depth(Vec3::ZERO) - 10.0).abs() < 1e-5);
}

#[test]
fn test_lod_distance() {
    let mut camera = forward_camera();
    assert!((camera.lod_distance(10.0, 2.0, 1.0) - 5.0).abs() < 1e-6);
    camera.set_lod_bias(2.0);
    assert!((camera.lod_distance(10.0, 1.0, 1.0) - 5.0).abs() < 1e-6);
}

#[test]
fn test_rotation_is_normalized() {
    let mut camera = Camera::new();
    camera.set_rotation(Quat::from_xyzw(0.0, 2.0, 0.0, 0.0));
    assert!((camera.rotation().length() - 1.0).abs() < 1e-6);
}
