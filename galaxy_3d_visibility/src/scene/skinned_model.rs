/// SkinnedModel - geometry deformed by a bone palette.
///
/// Bone world transforms are set from outside (animation is not part of this
/// crate); the world bounds are rebuilt from per-bone bounds during the
/// drawable update, so moving bones triggers reinsertion on the next frame.

use std::sync::Arc;
use glam::Mat4;
use smallvec::SmallVec;
use crate::math::BoundingBox;
use crate::resource::{Geometry, Material};
use super::drawable::{Drawable, GeometryType, SourceBatch, UpdateContext, ZoneId};

/// Palette entry: world transform plus the bone-local bounds of its vertices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bone {
    pub transform: Mat4,
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone)]
pub struct SkinnedModel {
    geometry: Arc<Geometry>,
    material: Option<Arc<Material>>,
    bones: Vec<Bone>,
    world_bounding_box: BoundingBox,
    bones_dirty: bool,
    cast_shadows: bool,
    view_mask: u32,
    light_mask: u32,
    zone: ZoneId,
}

impl SkinnedModel {
    pub fn new(geometry: Arc<Geometry>, material: Option<Arc<Material>>, bones: Vec<Bone>) -> Self {
        let mut model = Self {
            geometry,
            material,
            bones,
            world_bounding_box: BoundingBox::UNDEFINED,
            bones_dirty: true,
            cast_shadows: false,
            view_mask: u32::MAX,
            light_mask: u32::MAX,
            zone: ZoneId::default(),
        };
        model.update_bounds();
        model
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    /// Set new bone world transforms; bounds follow on the next update
    pub fn set_bone_transforms(&mut self, transforms: &[Mat4]) {
        for (bone, transform) in self.bones.iter_mut().zip(transforms) {
            bone.transform = *transform;
        }
        self.bones_dirty = true;
    }

    pub fn set_cast_shadows(&mut self, enable: bool) {
        self.cast_shadows = enable;
    }

    pub fn set_view_mask(&mut self, mask: u32) {
        self.view_mask = mask;
    }

    pub fn set_light_mask(&mut self, mask: u32) {
        self.light_mask = mask;
    }

    pub fn set_zone(&mut self, zone: ZoneId) {
        self.zone = zone;
    }

    fn update_bounds(&mut self) {
        let mut bounds = BoundingBox::UNDEFINED;
        for bone in &self.bones {
            if bone.bounds.is_defined() {
                bounds.merge(&bone.bounds.transformed(&bone.transform));
            }
        }
        self.world_bounding_box = bounds;
        self.bones_dirty = false;
    }
}

impl Drawable for SkinnedModel {
    fn world_bounding_box(&self) -> BoundingBox {
        self.world_bounding_box
    }

    fn view_mask(&self) -> u32 {
        self.view_mask
    }

    fn light_mask(&self) -> u32 {
        self.light_mask
    }

    fn zone(&self) -> ZoneId {
        self.zone
    }

    fn cast_shadows(&self) -> bool {
        self.cast_shadows
    }

    fn update(&mut self, _context: &UpdateContext<'_>) {
        if self.bones_dirty {
            self.update_bounds();
        }
    }

    fn collect_batches(&self, _lod_distance: f32, batches: &mut Vec<SourceBatch>) {
        let transforms: SmallVec<[Mat4; 1]> = self.bones.iter().map(|bone| bone.transform).collect();
        batches.push(SourceBatch {
            geometry: self.geometry.id(),
            geometry_type: GeometryType::Skinned,
            indexed: self.geometry.is_indexed(),
            material: self.material.clone(),
            transforms,
        });
    }
}

#[cfg(test)]
#[path = "skinned_model_tests.rs"]
mod tests;
