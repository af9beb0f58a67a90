use glam::{UVec2, Vec3};
use super::*;
use crate::camera::Camera;
use crate::math::IntRect;
use crate::scene::{CascadeParameters, FocusParameters, Light};

fn multi_map_allocator(max_shadow_maps: u32) -> ShadowMapAllocator {
    ShadowMapAllocator::new(ShadowSettings {
        reuse_shadow_maps: false,
        max_shadow_maps,
        ..Default::default()
    })
}

fn fixed_size(mut light: Light) -> Light {
    light.set_shadow_focus(FocusParameters { auto_size: false, ..Default::default() });
    light
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn test_settings_validate() {
    let settings = ShadowSettings { shadow_map_size: 100, reuse_shadow_maps: false, max_shadow_maps: 0 }.validate();
    assert_eq!(settings.shadow_map_size, 128);
    assert_eq!(settings.max_shadow_maps, 1);

    let tiny = ShadowSettings { shadow_map_size: 8, ..Default::default() }.validate();
    assert_eq!(tiny.shadow_map_size, SHADOW_MIN_PIXELS);
}

#[test]
fn test_settings_validate_clamps_huge_size() {
    let huge = ShadowSettings { shadow_map_size: u32::MAX, ..Default::default() }.validate();
    assert_eq!(huge.shadow_map_size, SHADOW_MAX_PIXELS);

    let odd = ShadowSettings { shadow_map_size: SHADOW_MAX_PIXELS + 1, ..Default::default() }.validate();
    assert_eq!(odd.shadow_map_size, SHADOW_MAX_PIXELS);
}

// ============================================================================
// Allocation
// ============================================================================

#[test]
fn test_reuse_mode_shares_one_map_per_size() {
    let mut allocator = ShadowMapAllocator::new(ShadowSettings::default());
    let first = allocator.allocate(1024, 1024);
    let second = allocator.allocate(1024, 1024);
    assert_eq!(first, Some(ShadowMapHandle::new(1024, 1024, 0)));
    assert_eq!(first, second);

    allocator.allocate(512, 512);
    assert_eq!(allocator.num_shadow_maps(), 2);
}

#[test]
fn test_multi_map_mode_exhausts_pool() {
    let mut allocator = multi_map_allocator(2);
    assert_eq!(allocator.allocate(1024, 1024).map(|map| map.index), Some(0));
    assert_eq!(allocator.allocate(1024, 1024).map(|map| map.index), Some(1));
    assert_eq!(allocator.allocate(1024, 1024), None);

    // Pool limits apply per size
    assert_eq!(allocator.allocate(512, 512).map(|map| map.index), Some(0));
    assert_eq!(allocator.num_allocated(), 3);
}

#[test]
fn test_reset_keeps_created_maps() {
    let mut allocator = multi_map_allocator(2);
    allocator.allocate(256, 256);
    allocator.allocate(256, 256);
    allocator.reset();

    assert_eq!(allocator.num_allocated(), 0);
    assert_eq!(allocator.num_shadow_maps(), 2);
    assert_eq!(allocator.allocate(256, 256).map(|map| map.index), Some(0));
    assert_eq!(allocator.num_shadow_maps(), 2);
}

#[test]
fn test_changing_settings_drops_pool() {
    let mut allocator = multi_map_allocator(2);
    allocator.allocate(256, 256);
    allocator.set_settings(*allocator.settings());
    assert_eq!(allocator.num_shadow_maps(), 1);

    allocator.set_settings(ShadowSettings::default());
    assert_eq!(allocator.num_shadow_maps(), 0);
    assert!(allocator.settings().reuse_shadow_maps);
}

#[test]
fn test_handle_key() {
    let handle = ShadowMapHandle::new(2048, 1024, 3);
    assert_eq!(handle.key(), (2048u64 << 32) | 1024);
    assert_ne!(ShadowMapHandle::new(65536, 0, 0).key(), ShadowMapHandle::new(0, 0, 0).key());
}

// ============================================================================
// Sizing
// ============================================================================

#[test]
fn test_oversized_base_size_is_clamped() {
    let camera = Camera::new();
    let light = fixed_size(Light::spot(Vec3::ZERO, Vec3::NEG_Z, 10.0, 45.0));
    let size = shadow_map_size(&light, &camera, UVec2::new(800, 600), u32::MAX);
    assert_eq!(size, UVec2::splat(SHADOW_MAX_PIXELS));
}

#[test]
fn test_directional_map_grows_with_cascades() {
    let camera = Camera::new();
    let view_size = UVec2::new(800, 600);

    let mut light = Light::directional(Vec3::NEG_Y);
    assert_eq!(shadow_map_size(&light, &camera, view_size, 1024), UVec2::new(1024, 1024));

    light.set_shadow_cascade(CascadeParameters::new([10.0, 50.0, 0.0, 0.0], 0.8));
    assert_eq!(shadow_map_size(&light, &camera, view_size, 1024), UVec2::new(2048, 1024));

    light.set_shadow_cascade(CascadeParameters::new([10.0, 20.0, 50.0, 100.0], 0.8));
    assert_eq!(shadow_map_size(&light, &camera, view_size, 1024), UVec2::new(2048, 2048));
}

#[test]
fn test_point_light_map_holds_six_faces() {
    let camera = Camera::new();
    let light = fixed_size(Light::point(Vec3::new(0.0, 0.0, -10.0), 5.0));
    assert_eq!(shadow_map_size(&light, &camera, UVec2::new(800, 600), 1024), UVec2::new(2048, 3072));
}

#[test]
fn test_auto_size_shrinks_distant_light() {
    let camera = Camera::looking_at(Vec3::ZERO, Vec3::NEG_Z, 60.0, 0.1, 1000.0);
    let light = Light::point(Vec3::new(0.0, 0.0, -100.0), 1.0);
    assert_eq!(shadow_map_size(&light, &camera, UVec2::new(800, 600), 1024), UVec2::new(128, 192));
}

#[test]
fn test_resolution_scales_and_rounds_up() {
    let camera = Camera::new();
    let mut light = fixed_size(Light::spot(Vec3::ZERO, Vec3::NEG_Z, 10.0, 45.0));
    light.set_shadow_resolution(0.4);
    // 1024 * 0.4 = 409.6 rounds up to the next power of two
    assert_eq!(shadow_map_size(&light, &camera, UVec2::new(800, 600), 1024), UVec2::new(512, 512));
}

// ============================================================================
// Viewports
// ============================================================================

#[test]
fn test_directional_viewports() {
    let mut light = Light::directional(Vec3::NEG_Y);
    let map = ShadowMapHandle::new(2048, 2048, 0);
    assert_eq!(shadow_map_viewport(&light, 0, &map), IntRect::new(0, 0, 2048, 2048));

    light.set_shadow_cascade(CascadeParameters::new([10.0, 50.0, 0.0, 0.0], 0.8));
    let halves = ShadowMapHandle::new(2048, 1024, 0);
    assert_eq!(shadow_map_viewport(&light, 1, &halves), IntRect::new(1024, 0, 2048, 1024));

    light.set_shadow_cascade(CascadeParameters::new([10.0, 20.0, 50.0, 100.0], 0.8));
    assert_eq!(shadow_map_viewport(&light, 2, &map), IntRect::new(0, 1024, 1024, 2048));
    assert_eq!(shadow_map_viewport(&light, 3, &map), IntRect::new(1024, 1024, 2048, 2048));
}

#[test]
fn test_point_light_viewports_tile_the_map() {
    let light = Light::point(Vec3::ZERO, 5.0);
    let map = ShadowMapHandle::new(512, 768, 0);
    let viewports: Vec<IntRect> = (0..6).map(|split| shadow_map_viewport(&light, split, &map)).collect();

    assert_eq!(viewports[0], IntRect::new(0, 0, 256, 256));
    assert_eq!(viewports[5], IntRect::new(256, 512, 512, 768));
    let area: i32 = viewports.iter().map(|rect| rect.width() * rect.height()).sum();
    assert_eq!(area, 512 * 768);
}
