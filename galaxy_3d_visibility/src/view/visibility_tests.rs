use std::sync::Arc;
use glam::{Mat4, Vec3};
use super::*;
use crate::occlusion::OcclusionBuffer;
use crate::resource::{Geometry, GeometryDesc, GeometryId};
use crate::scene::{FrustumOctreeQuery, ModelPart, OctreeDesc, StaticModel};
use crate::work_queue::SerialWorkQueue;

fn cube(id: u32, half: f32) -> Arc<Geometry> {
    let h = half;
    let positions = vec![
        Vec3::new(-h, -h, -h), Vec3::new(h, -h, -h), Vec3::new(h, h, -h), Vec3::new(-h, h, -h),
        Vec3::new(-h, -h, h), Vec3::new(h, -h, h), Vec3::new(h, h, h), Vec3::new(-h, h, h),
    ];
    let indices = vec![
        0, 1, 2, 0, 2, 3,
        4, 6, 5, 4, 7, 6,
        0, 4, 5, 0, 5, 1,
        3, 2, 6, 3, 6, 7,
        0, 3, 7, 0, 7, 4,
        1, 5, 6, 1, 6, 2,
    ];
    Arc::new(Geometry::from_desc(GeometryDesc { id: GeometryId(id), positions, indices, lod_distance: 0.0 }).unwrap())
}

fn model(half: f32, center: Vec3) -> StaticModel {
    StaticModel::new(vec![ModelPart::new(cube(1, half), None)], Mat4::from_translation(center))
}

/// Geometry with unbounded extent, like a skybox
struct Unbounded;

impl Drawable for Unbounded {
    fn world_bounding_box(&self) -> BoundingBox {
        BoundingBox::from_extent(LARGE_VALUE)
    }
}

fn octree() -> Octree {
    Octree::new(OctreeDesc::default(), Arc::new(SerialWorkQueue))
}

fn camera() -> Camera {
    Camera::looking_at(Vec3::ZERO, Vec3::NEG_Z, 60.0, 0.1, 100.0)
}

fn check_all(octree: &Octree, camera: &Camera, buffer: Option<&OcclusionBuffer>) -> VisibilityChunk {
    let mut keys = Vec::new();
    octree.get_drawables(&mut FrustumOctreeQuery::new(
        &mut keys,
        camera.frustum(),
        DrawableFlags::GEOMETRY | DrawableFlags::LIGHT,
        u32::MAX,
    ));
    let mut chunk = VisibilityChunk::default();
    check_visibility(octree, camera, buffer, &keys, &mut chunk);
    chunk
}

// ============================================================================
// Geometry
// ============================================================================

#[test]
fn test_geometry_depth_range_and_batches() {
    let mut octree = octree();
    let key = octree.insert(model(1.0, Vec3::new(0.0, 0.0, -10.0)));

    let chunk = check_all(&octree, &camera(), None);
    assert_eq!(chunk.geometries.len(), 1);
    let geometry = &chunk.geometries[0];
    assert_eq!(geometry.drawable, key);
    assert!((geometry.distance - 10.0).abs() < 1e-4);
    assert!((geometry.min_z - 9.0).abs() < 1e-4);
    assert!((geometry.max_z - 11.0).abs() < 1e-4);
    assert_eq!(geometry.batches.len(), 1);
    assert_eq!(chunk.min_z, geometry.min_z);
    assert_eq!(chunk.max_z, geometry.max_z);
}

#[test]
fn test_rotated_camera_depth_uses_view_axis() {
    let mut octree = octree();
    octree.insert(model(1.0, Vec3::new(10.0, 0.0, 0.0)));
    let camera = Camera::looking_at(Vec3::ZERO, Vec3::X, 60.0, 0.1, 100.0);

    let chunk = check_all(&octree, &camera, None);
    assert_eq!(chunk.geometries.len(), 1);
    assert!((chunk.min_z - 9.0).abs() < 1e-3);
    assert!((chunk.max_z - 11.0).abs() < 1e-3);
}

#[test]
fn test_draw_distance_rejects_far_geometry() {
    let mut octree = octree();
    let mut far = model(1.0, Vec3::new(0.0, 0.0, -40.0));
    far.set_draw_distance(20.0);
    octree.insert(far);
    let mut near = model(1.0, Vec3::new(0.0, 0.0, -10.0));
    near.set_draw_distance(20.0);
    let near = octree.insert(near);

    let chunk = check_all(&octree, &camera(), None);
    let keys: Vec<DrawableKey> = chunk.geometries.iter().map(|geometry| geometry.drawable).collect();
    assert_eq!(keys, vec![near]);
}

#[test]
fn test_unbounded_geometry_keeps_depth_range() {
    let mut octree = octree();
    octree.insert(Unbounded);
    octree.insert(model(1.0, Vec3::new(0.0, 0.0, -10.0)));

    let chunk = check_all(&octree, &camera(), None);
    assert_eq!(chunk.geometries.len(), 2);
    let unbounded = chunk.geometries.iter().find(|geometry| geometry.min_z == LARGE_VALUE).unwrap();
    assert_eq!(unbounded.max_z, LARGE_VALUE);
    assert!((chunk.max_z - 11.0).abs() < 1e-4);
}

// ============================================================================
// Lights
// ============================================================================

#[test]
fn test_lights_record_distance_and_sort_value() {
    let mut octree = octree();
    octree.insert(Light::directional(Vec3::NEG_Y));
    octree.insert(Light::point(Vec3::new(0.0, 0.0, -5.0), 3.0));

    let chunk = check_all(&octree, &camera(), None);
    assert_eq!(chunk.lights.len(), 2);
    let directional = chunk.lights.iter().find(|light| light.light.light_type() == LightType::Directional).unwrap();
    assert_eq!(directional.distance, 0.0);
    let point = chunk.lights.iter().find(|light| light.light.light_type() == LightType::Point).unwrap();
    assert!((point.distance - 5.0).abs() < 1e-4);
    assert_eq!(point.sort_value, point.light.intensity_sort_value(point.distance));
    assert!(chunk.geometries.is_empty());
}

#[test]
fn test_black_light_is_dropped() {
    let mut octree = octree();
    let mut light = Light::point(Vec3::new(0.0, 0.0, -5.0), 3.0);
    light.set_brightness(0.0);
    octree.insert(light);

    let chunk = check_all(&octree, &camera(), None);
    assert!(chunk.lights.is_empty());
}

// ============================================================================
// Occluders
// ============================================================================

#[test]
fn test_occluder_screen_size_shrinks_with_distance() {
    let camera = camera();
    let near = model(1.0, Vec3::new(0.0, 0.0, -5.0));
    let far = model(1.0, Vec3::new(0.0, 0.0, -50.0));
    let near_size = occluder_screen_size(&camera, &near, 5.0);
    let far_size = occluder_screen_size(&camera, &far, 50.0);
    assert!(near_size > far_size);

    // Being inside the occluder boosts it
    let around = model(1.0, Vec3::ZERO);
    assert!(occluder_screen_size(&camera, &around, 0.5) > occluder_screen_size(&camera, &near, 0.5));
}

#[test]
fn test_select_occluders_orders_near_to_far() {
    let mut octree = octree();
    let mut keys = Vec::new();
    for z in [-30.0, -5.0, -15.0] {
        let mut occluder = model(2.0, Vec3::new(0.0, 0.0, z));
        occluder.set_occluder(true);
        keys.push(octree.insert(occluder));
    }

    let selected = select_occluders(&octree, &camera(), 0.0, &keys);
    let order: Vec<DrawableKey> = selected.iter().map(|(key, _)| *key).collect();
    assert_eq!(order, vec![keys[1], keys[2], keys[0]]);
    assert!(selected.windows(2).all(|pair| pair[0].1 <= pair[1].1));

    assert!(select_occluders(&octree, &camera(), f32::MAX, &keys).is_empty());
}

#[test]
fn test_occluders_hide_geometry_behind_them() {
    let camera = camera();
    let mut octree = octree();
    let mut wall = model(4.0, Vec3::new(0.0, 0.0, -6.0));
    wall.set_occluder(true);
    let wall = octree.insert(wall);
    let mut hidden_wall = model(2.0, Vec3::new(0.0, 0.0, -20.0));
    hidden_wall.set_occluder(true);
    let hidden_wall = octree.insert(hidden_wall);
    let hidden = octree.insert(model(0.5, Vec3::new(0.0, 0.0, -30.0)));

    let occluders = select_occluders(&octree, &camera, 0.0, &[wall, hidden_wall]);
    let mut buffer = OcclusionBuffer::new(64, 48);
    buffer.set_view(&camera);
    buffer.set_max_triangles(1000);
    buffer.clear();

    // The second occluder is already hidden by the first
    assert_eq!(draw_occluders(&octree, &mut buffer, &occluders), 1);

    let chunk = check_all(&octree, &camera, Some(&buffer));
    let keys: Vec<DrawableKey> = chunk.geometries.iter().map(|geometry| geometry.drawable).collect();
    assert!(keys.contains(&wall));
    assert!(!keys.contains(&hidden));
    assert!(!keys.contains(&hidden_wall));
}
