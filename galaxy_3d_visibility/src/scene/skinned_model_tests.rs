use std::sync::{Arc, Mutex};
use glam::{Mat4, Vec3};
use super::*;
use crate::resource::{GeometryDesc, GeometryId};
use crate::scene::drawable::FrameInfo;

fn model() -> SkinnedModel {
    let geometry = Geometry::from_desc(GeometryDesc {
        id: GeometryId(9),
        positions: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
        indices: vec![0, 1, 2],
        lod_distance: 0.0,
    })
    .unwrap();
    let bone = |x: f32| Bone {
        transform: Mat4::from_translation(Vec3::new(x, 0.0, 0.0)),
        bounds: BoundingBox::from_center_half_size(Vec3::ZERO, Vec3::splat(0.5)),
    };
    SkinnedModel::new(Arc::new(geometry), None, vec![bone(0.0), bone(4.0)])
}

#[test]
fn test_bounds_cover_all_bones() {
    let model = model();
    let bounds = model.world_bounding_box();
    assert_eq!(bounds.min.x, -0.5);
    assert_eq!(bounds.max.x, 4.5);
}

#[test]
fn test_bone_changes_apply_on_update() {
    let mut model = model();
    model.set_bone_transforms(&[Mat4::IDENTITY, Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0))]);
    assert_eq!(model.world_bounding_box().max.x, 4.5);

    let frame = FrameInfo::default();
    let requests = Mutex::new(Vec::new());
    model.update(&UpdateContext::new(&frame, &requests));
    assert_eq!(model.world_bounding_box().max.x, 10.5);
}

#[test]
fn test_skinned_batch_carries_bone_palette() {
    let model = model();
    let mut batches = Vec::new();
    model.collect_batches(0.0, &mut batches);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].geometry_type, GeometryType::Skinned);
    assert_eq!(batches[0].transforms.len(), 2);
}
