use std::sync::Arc;
use glam::{Mat4, Vec3};
use super::*;
use crate::math::Ray;
use crate::resource::{GeometryDesc, GeometryId};
use crate::scene::drawable::GeometryType;
use slotmap::SlotMap;

fn cube(id: u32, half: f32, lod_distance: f32) -> Arc<Geometry> {
    let h = half;
    let positions = vec![
        Vec3::new(-h, -h, -h), Vec3::new(h, -h, -h), Vec3::new(h, h, -h), Vec3::new(-h, h, -h),
        Vec3::new(-h, -h, h), Vec3::new(h, -h, h), Vec3::new(h, h, h), Vec3::new(-h, h, h),
    ];
    let indices = vec![
        0, 1, 2, 0, 2, 3, // back
        4, 6, 5, 4, 7, 6, // front
        0, 4, 5, 0, 5, 1, // bottom
        3, 2, 6, 3, 6, 7, // top
        0, 3, 7, 0, 7, 4, // left
        1, 5, 6, 1, 6, 2, // right
    ];
    Arc::new(Geometry::from_desc(GeometryDesc { id: GeometryId(id), positions, indices, lod_distance }).unwrap())
}

fn key() -> DrawableKey {
    let mut keys: SlotMap<DrawableKey, ()> = SlotMap::with_key();
    keys.insert(())
}

// ============================================================================
// Bounds / LOD
// ============================================================================

#[test]
fn test_world_bounds_follow_transform() {
    let model = StaticModel::new(
        vec![ModelPart::new(cube(1, 1.0, 0.0), None)],
        Mat4::from_scale_rotation_translation(Vec3::splat(2.0), glam::Quat::IDENTITY, Vec3::new(10.0, 0.0, 0.0)),
    );
    let bounds = model.world_bounding_box();
    assert_eq!(bounds.min, Vec3::new(8.0, -2.0, -2.0));
    assert_eq!(bounds.max, Vec3::new(12.0, 2.0, 2.0));
    assert!((model.world_scale() - 2.0).abs() < 1e-6);
}

#[test]
fn test_lod_level_selection() {
    let part = ModelPart {
        lods: vec![cube(1, 1.0, 0.0), cube(2, 1.0, 20.0), cube(3, 1.0, 50.0)],
        material: None,
    };
    assert_eq!(part.lod_level(5.0), 0);
    assert_eq!(part.lod_level(20.0), 0);
    assert_eq!(part.lod_level(30.0), 1);
    assert_eq!(part.lod_level(80.0), 2);

    let model = StaticModel::new(vec![part], Mat4::IDENTITY);
    let mut batches = Vec::new();
    model.collect_batches(30.0, &mut batches);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].geometry, GeometryId(2));
    assert_eq!(batches[0].geometry_type, GeometryType::Static);
    assert!(batches[0].indexed);
}

// ============================================================================
// Ray queries
// ============================================================================

#[test]
fn test_triangle_ray_query_reports_part() {
    let model = StaticModel::new(
        vec![
            ModelPart::new(cube(1, 1.0, 0.0), None),
            ModelPart::new(cube(2, 0.5, 0.0), None),
        ],
        Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0)),
    );
    let query = RayOctreeQuery::new(Ray::new(Vec3::ZERO, Vec3::NEG_Z));
    let mut results = Vec::new();
    model.process_ray_query(key(), &query, &mut results);
    assert_eq!(results.len(), 1);
    assert!((results[0].distance - 9.0).abs() < 1e-4);
    assert_eq!(results[0].sub_object, Some(0));
    assert!((results[0].normal.z.abs() - 1.0).abs() < 1e-4);
}

#[test]
fn test_ray_query_miss_and_max_distance() {
    let model = StaticModel::new(vec![ModelPart::new(cube(1, 1.0, 0.0), None)], Mat4::from_translation(Vec3::new(0.0, 0.0, -10.0)));
    let mut results = Vec::new();

    let miss = RayOctreeQuery::new(Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::NEG_Z));
    model.process_ray_query(key(), &miss, &mut results);
    assert!(results.is_empty());

    let short = RayOctreeQuery::new(Ray::new(Vec3::ZERO, Vec3::NEG_Z)).with_max_distance(5.0);
    model.process_ray_query(key(), &short, &mut results);
    assert!(results.is_empty());

    let aabb = RayOctreeQuery::new(Ray::new(Vec3::ZERO, Vec3::NEG_Z)).with_level(RayQueryLevel::Aabb);
    model.process_ray_query(key(), &aabb, &mut results);
    assert_eq!(results[0].sub_object, None);
}

// ============================================================================
// Occlusion
// ============================================================================

#[test]
fn test_occluder_triangles_and_drawing() {
    let mut model = StaticModel::new(vec![ModelPart::new(cube(1, 5.0, 0.0), None)], Mat4::from_translation(Vec3::new(0.0, 0.0, -20.0)));
    model.set_occluder(true);
    assert!(model.is_occluder());
    assert_eq!(model.num_occluder_triangles(), 12);

    let camera = crate::camera::Camera::looking_at(Vec3::ZERO, Vec3::NEG_Z, 60.0, 1.0, 100.0);
    let mut buffer = OcclusionBuffer::new(64, 64);
    buffer.set_view(&camera);
    assert!(model.draw_occlusion(&mut buffer));
    assert_eq!(buffer.num_triangles(), 12);

    let behind = BoundingBox::from_center_half_size(Vec3::new(0.0, 0.0, -40.0), Vec3::ONE);
    assert!(!buffer.is_visible(&behind));

    buffer.clear();
    buffer.set_max_triangles(4);
    assert!(!model.draw_occlusion(&mut buffer));
}
