use std::sync::Arc;
use glam::{Mat4, Vec3};
use smallvec::smallvec;
use super::*;
use crate::resource::{GeometryId, Material, MaterialDesc, PassDesc, PassIndex, PassRegistry, Technique, TechniqueDesc};
use crate::scene::{DrawableKey, SourceBatch};

fn material() -> Arc<Material> {
    let mut registry = PassRegistry::new();
    let desc = TechniqueDesc {
        name: "NoTexture".to_string(),
        vertex_shader: "LitSolid".to_string(),
        pixel_shader: "LitSolid".to_string(),
        passes: vec![PassDesc::new("base")],
        ..Default::default()
    };
    let technique = Arc::new(Technique::from_desc(desc, &mut registry).unwrap());
    Arc::new(Material::from_desc(MaterialDesc::new("Grey", technique)).unwrap())
}

fn batch(material: &Arc<Material>, geometry: u32, distance: f32) -> Batch {
    let pass = Arc::clone(material.techniques()[0].technique.pass(PassIndex::BASE).unwrap());
    let source = SourceBatch::new(GeometryId(geometry), Some(Arc::clone(material)), Mat4::IDENTITY);
    let mut batch = Batch::new(&source, DrawableKey::default(), Arc::clone(material), pass, distance);
    batch.is_base = true;
    batch
}

fn geometries(queue: &BatchQueue) -> Vec<u32> {
    queue.sorted_batches().map(|batch| batch.geometry.0).collect()
}

// ============================================================================
// Adding batches
// ============================================================================

#[test]
fn test_group_switches_to_instancing_at_threshold() {
    let material = material();
    let mut queue = BatchQueue::new();
    let mut shader_calls = Vec::new();

    queue.add_batch(batch(&material, 1, 4.0), true, 2, |b| shader_calls.push(b.geometry_type));
    assert_eq!(queue.groups().len(), 1);
    assert!(!queue.groups()[0].is_instanced());
    assert_eq!(queue.num_draw_calls(), 1);

    queue.add_batch(batch(&material, 1, 2.0), true, 2, |b| shader_calls.push(b.geometry_type));
    assert_eq!(queue.groups().len(), 1);
    assert!(queue.groups()[0].is_instanced());
    assert_eq!(shader_calls, vec![GeometryType::Static, GeometryType::Instanced]);
    assert_eq!(queue.num_draw_calls(), 1);
    assert_eq!(queue.num_instances(), 2);
    assert!(queue.batches().is_empty());
}

#[test]
fn test_non_indexed_geometry_is_not_grouped() {
    let material = material();
    let mut queue = BatchQueue::new();
    let mut plain = batch(&material, 1, 1.0);
    plain.indexed = false;
    queue.add_batch(plain, true, 2, |_| {});
    assert!(queue.groups().is_empty());
    assert_eq!(queue.batches().len(), 1);
}

#[test]
fn test_static_batch_with_many_transforms_is_split() {
    let material = material();
    let mut queue = BatchQueue::new();
    let mut multi = batch(&material, 1, 1.0);
    multi.transforms = smallvec![
        Mat4::IDENTITY,
        Mat4::from_translation(Vec3::X),
        Mat4::from_translation(Vec3::Y),
    ];
    queue.add_batch(multi, false, 2, |_| {});
    assert_eq!(queue.batches().len(), 3);
    assert!(queue.batches().iter().all(|b| b.transforms.len() == 1));
    assert_eq!(queue.num_draw_calls(), 3);
}

// ============================================================================
// Sorting
// ============================================================================

#[test]
fn test_front_to_back_keeps_state_runs_together() {
    let material = material();
    let mut queue = BatchQueue::new();
    for (geometry, distance) in [(1, 10.0), (2, 1.0), (1, 5.0), (2, 20.0)] {
        queue.add_batch(batch(&material, geometry, distance), false, 2, |_| {});
    }
    queue.sort_front_to_back();

    // Nearest batch's state first, then each state run near to far
    let distances: Vec<f32> = queue.sorted_batches().map(|b| b.distance).collect();
    assert_eq!(geometries(&queue), vec![2, 2, 1, 1]);
    assert_eq!(distances, vec![1.0, 20.0, 5.0, 10.0]);
}

#[test]
fn test_render_order_dominates_distance() {
    let material = material();
    let mut queue = BatchQueue::new();
    let mut late = batch(&material, 1, 0.5);
    late.render_order = 200;
    queue.add_batch(late, false, 2, |_| {});
    queue.add_batch(batch(&material, 2, 50.0), false, 2, |_| {});

    queue.sort_front_to_back();
    assert_eq!(geometries(&queue), vec![2, 1]);

    queue.sort_back_to_front();
    assert_eq!(geometries(&queue), vec![2, 1]);
}

#[test]
fn test_back_to_front_order() {
    let material = material();
    let mut queue = BatchQueue::new();
    for (geometry, distance) in [(1, 1.0), (2, 5.0), (3, 3.0)] {
        queue.add_batch(batch(&material, geometry, distance), false, 2, |_| {});
    }
    queue.sort_back_to_front();
    assert_eq!(geometries(&queue), vec![2, 3, 1]);
}

#[test]
fn test_group_distance_is_nearest_instance() {
    let material = material();
    let mut queue = BatchQueue::new();
    for distance in [8.0, 3.0, 6.0] {
        queue.add_batch(batch(&material, 1, distance), true, 2, |_| {});
    }
    queue.sort_front_to_back();

    let group = queue.sorted_groups().next().unwrap();
    assert_eq!(group.batch.distance, 3.0);
    let distances: Vec<f32> = group.instances.iter().map(|i| i.distance).collect();
    assert_eq!(distances, vec![3.0, 6.0, 8.0]);
}

#[test]
fn test_large_groups_are_not_instance_sorted() {
    let material = material();
    let mut queue = BatchQueue::new();
    queue.clear(1);
    for distance in [8.0, 3.0] {
        queue.add_batch(batch(&material, 1, distance), true, 2, |_| {});
    }
    queue.sort_front_to_back();

    let group = &queue.groups()[0];
    assert_eq!(group.batch.distance, 3.0);
    assert_eq!(group.instances[0].distance, 8.0);
}

// ============================================================================
// Instancing stream / lifecycle
// ============================================================================

#[test]
fn test_instancing_data_only_for_instanced_groups() {
    let material = material();
    let mut queue = BatchQueue::new();
    queue.add_batch(batch(&material, 1, 1.0), true, 2, |_| {});
    queue.add_batch(batch(&material, 1, 2.0), true, 2, |_| {});
    queue.add_batch(batch(&material, 2, 1.0), true, 2, |_| {});

    let mut stream = Vec::new();
    queue.set_instancing_data(&mut stream);
    assert_eq!(stream.len(), 2);
    assert_eq!(queue.groups()[0].start_index, Some(0));
    assert_eq!(queue.groups()[1].start_index, None);
}

#[test]
fn test_clear_resets_queue() {
    let material = material();
    let mut queue = BatchQueue::new();
    queue.add_batch(batch(&material, 1, 1.0), true, 2, |_| {});
    queue.add_batch(batch(&material, 1, 1.0), false, 2, |_| {});
    queue.sort_front_to_back();
    assert!(queue.has_batches());

    queue.clear(DEFAULT_MAX_SORTED_INSTANCES);
    assert!(!queue.has_batches());
    assert_eq!(queue.sorted_batches().count(), 0);
    assert_eq!(queue.sorted_groups().count(), 0);
}

#[test]
fn test_light_queue_shadow_map_need() {
    let mut queue = LightBatchQueue::for_light(0, false);
    assert!(!queue.needs_shadow_map());
    queue.shadow_map = Some(crate::shadow::ShadowMapHandle::new(1024, 1024, 0));
    assert!(!queue.needs_shadow_map());
    queue.has_lit_alpha = true;
    assert!(queue.needs_shadow_map());
}
