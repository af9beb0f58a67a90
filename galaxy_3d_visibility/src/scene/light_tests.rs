use glam::{Vec3, Vec4};
use super::*;
use crate::math::Intersection;

// ============================================================================
// Bounds
// ============================================================================

#[test]
fn test_directional_bounds_are_unbounded() {
    let light = Light::directional(Vec3::NEG_Y);
    let bounds = light.world_bounding_box();
    assert_eq!(bounds.max, Vec3::splat(LARGE_VALUE));
    assert!(!light.is_occludee());
}

#[test]
fn test_point_bounds_cover_range() {
    let light = Light::point(Vec3::new(1.0, 2.0, 3.0), 5.0);
    let bounds = light.world_bounding_box();
    assert_eq!(bounds.min, Vec3::new(-4.0, -3.0, -2.0));
    assert_eq!(bounds.max, Vec3::new(6.0, 7.0, 8.0));
}

#[test]
fn test_spot_frustum_points_along_direction() {
    let light = Light::spot(Vec3::ZERO, Vec3::X, 10.0, 45.0);
    assert!((light.direction() - Vec3::X).length() < 1e-5);
    let frustum = light.frustum();
    assert_eq!(frustum.is_inside_point(Vec3::new(5.0, 0.0, 0.0)), Intersection::Inside);
    assert_eq!(frustum.is_inside_point(Vec3::new(-5.0, 0.0, 0.0)), Intersection::Outside);
    assert!(light.world_bounding_box().max.x <= 10.0 + 1e-3);
}

// ============================================================================
// Color / sorting
// ============================================================================

#[test]
fn test_negative_light() {
    let mut light = Light::point(Vec3::ZERO, 1.0);
    assert!(!light.is_negative());
    light.set_brightness(-1.0);
    assert!(light.is_negative());
}

#[test]
fn test_closer_light_sorts_first() {
    let light = Light::point(Vec3::ZERO, 10.0);
    assert!(light.intensity_sort_value(1.0) < light.intensity_sort_value(5.0));

    let near_box = BoundingBox::from_center_half_size(Vec3::new(2.0, 0.0, 0.0), Vec3::splat(0.5));
    let far_box = BoundingBox::from_center_half_size(Vec3::new(8.0, 0.0, 0.0), Vec3::splat(0.5));
    assert!(light.intensity_sort_value_for_box(&near_box) < light.intensity_sort_value_for_box(&far_box));
}

#[test]
fn test_brighter_light_sorts_first() {
    let dim = Light::point(Vec3::ZERO, 10.0);
    let mut bright = Light::point(Vec3::ZERO, 10.0);
    bright.set_brightness(4.0);
    assert!(bright.intensity_sort_value(3.0) < dim.intensity_sort_value(3.0));
}

// ============================================================================
// Shadow parameters
// ============================================================================

#[test]
fn test_shadow_split_counts() {
    let mut light = Light::directional(Vec3::NEG_Y);
    assert_eq!(light.num_shadow_splits(), 1);
    light.set_shadow_cascade(CascadeParameters::new([10.0, 30.0, 80.0, 0.0], 0.8));
    assert_eq!(light.num_shadow_splits(), 3);
    assert_eq!(light.shadow_cascade().shadow_range(), 80.0);

    assert_eq!(Light::new(LightType::Spot).num_shadow_splits(), 1);
    assert_eq!(Light::new(LightType::Point).num_shadow_splits(), MAX_LIGHT_SPLITS);
}

#[test]
fn test_parameter_validation() {
    let focus = FocusParameters { quantize: 0.0, min_view: 0.0, ..Default::default() }.validate();
    assert_eq!(focus.quantize, SHADOW_MIN_QUANTIZE);
    assert_eq!(focus.min_view, SHADOW_MIN_VIEW);

    let cascade = CascadeParameters { splits: Vec4::new(-1.0, 5.0, 0.0, 0.0), fade_start: 2.0, bias_auto_adjust: -1.0 }
        .validate();
    assert_eq!(cascade.splits.x, 0.0);
    assert_eq!(cascade.fade_start, 1.0);
    assert_eq!(cascade.bias_auto_adjust, 0.0);

    let bias = BiasParameters { constant_bias: 5.0, slope_scaled_bias: -40.0, normal_offset: -1.0 }.validate();
    assert_eq!(bias.constant_bias, 1.0);
    assert_eq!(bias.slope_scaled_bias, -16.0);
    assert_eq!(bias.normal_offset, 0.0);
}
