/// StaticModel - rigid geometry with per-part LOD levels.
///
/// Each part has a list of geometries ordered by increasing LOD distance and
/// an optional material. The same triangles serve ray picking and, from the
/// configured occlusion LOD, occlusion rasterization.

use std::sync::Arc;
use glam::Mat4;
use crate::math::BoundingBox;
use crate::occlusion::OcclusionBuffer;
use crate::resource::{Geometry, Material};
use super::drawable::{max_scale, Drawable, DrawableKey, SourceBatch, ZoneId};
use super::octree_query::{RayOctreeQuery, RayQueryLevel, RayQueryResult};

/// One geometry slot of a model
#[derive(Debug, Clone)]
pub struct ModelPart {
    /// LOD geometries, most detailed first
    pub lods: Vec<Arc<Geometry>>,
    pub material: Option<Arc<Material>>,
}

impl ModelPart {
    pub fn new(geometry: Arc<Geometry>, material: Option<Arc<Material>>) -> Self {
        Self { lods: vec![geometry], material }
    }

    /// LOD level used at a distance: the last geometry whose LOD distance is below it
    pub fn lod_level(&self, lod_distance: f32) -> usize {
        let mut level = 1;
        while level < self.lods.len() && lod_distance > self.lods[level].lod_distance() {
            level += 1;
        }
        level - 1
    }

    fn occludes(&self) -> bool {
        self.material.as_ref().map_or(true, |material| material.occlusion())
    }
}

#[derive(Debug, Clone)]
pub struct StaticModel {
    transform: Mat4,
    parts: Vec<ModelPart>,
    bounding_box: BoundingBox,
    occlusion_lod: usize,
    occluder: bool,
    occludee: bool,
    cast_shadows: bool,
    draw_distance: f32,
    shadow_distance: f32,
    lod_bias: f32,
    max_lights: u32,
    view_mask: u32,
    light_mask: u32,
    shadow_mask: u32,
    zone: ZoneId,
}

impl StaticModel {
    pub fn new(parts: Vec<ModelPart>, transform: Mat4) -> Self {
        let mut bounding_box = BoundingBox::UNDEFINED;
        for part in &parts {
            if let Some(geometry) = part.lods.first() {
                bounding_box.merge(geometry.bounding_box());
            }
        }

        Self {
            transform,
            parts,
            bounding_box,
            occlusion_lod: 0,
            occluder: false,
            occludee: true,
            cast_shadows: false,
            draw_distance: 0.0,
            shadow_distance: 0.0,
            lod_bias: 1.0,
            max_lights: 0,
            view_mask: u32::MAX,
            light_mask: u32::MAX,
            shadow_mask: u32::MAX,
            zone: ZoneId::default(),
        }
    }

    pub fn parts(&self) -> &[ModelPart] {
        &self.parts
    }

    pub fn transform(&self) -> &Mat4 {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Mat4) {
        self.transform = transform;
    }

    /// Local-space bounds
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    pub fn set_occluder(&mut self, enable: bool) {
        self.occluder = enable;
    }

    pub fn set_occludee(&mut self, enable: bool) {
        self.occludee = enable;
    }

    /// LOD level rasterized into the occlusion buffer
    pub fn set_occlusion_lod(&mut self, level: usize) {
        self.occlusion_lod = level;
    }

    pub fn set_cast_shadows(&mut self, enable: bool) {
        self.cast_shadows = enable;
    }

    pub fn set_draw_distance(&mut self, distance: f32) {
        self.draw_distance = distance.max(0.0);
    }

    pub fn set_shadow_distance(&mut self, distance: f32) {
        self.shadow_distance = distance.max(0.0);
    }

    pub fn set_lod_bias(&mut self, bias: f32) {
        self.lod_bias = bias.max(f32::EPSILON);
    }

    pub fn set_max_lights(&mut self, max_lights: u32) {
        self.max_lights = max_lights;
    }

    pub fn set_view_mask(&mut self, mask: u32) {
        self.view_mask = mask;
    }

    pub fn set_light_mask(&mut self, mask: u32) {
        self.light_mask = mask;
    }

    pub fn set_shadow_mask(&mut self, mask: u32) {
        self.shadow_mask = mask;
    }

    pub fn set_zone(&mut self, zone: ZoneId) {
        self.zone = zone;
    }

    fn occlusion_geometry(&self, part: &ModelPart) -> Option<Arc<Geometry>> {
        let level = self.occlusion_lod.min(part.lods.len().saturating_sub(1));
        part.lods.get(level).cloned()
    }
}

impl Drawable for StaticModel {
    fn world_bounding_box(&self) -> BoundingBox {
        self.bounding_box.transformed(&self.transform)
    }

    fn view_mask(&self) -> u32 {
        self.view_mask
    }

    fn light_mask(&self) -> u32 {
        self.light_mask
    }

    fn shadow_mask(&self) -> u32 {
        self.shadow_mask
    }

    fn zone(&self) -> ZoneId {
        self.zone
    }

    fn is_occluder(&self) -> bool {
        self.occluder
    }

    fn is_occludee(&self) -> bool {
        self.occludee
    }

    fn cast_shadows(&self) -> bool {
        self.cast_shadows
    }

    fn draw_distance(&self) -> f32 {
        self.draw_distance
    }

    fn shadow_distance(&self) -> f32 {
        self.shadow_distance
    }

    fn lod_bias(&self) -> f32 {
        self.lod_bias
    }

    fn max_lights(&self) -> u32 {
        self.max_lights
    }

    fn world_scale(&self) -> f32 {
        max_scale(&self.transform)
    }

    fn collect_batches(&self, lod_distance: f32, batches: &mut Vec<SourceBatch>) {
        for part in &self.parts {
            let Some(geometry) = part.lods.get(part.lod_level(lod_distance)) else { continue };
            let mut batch = SourceBatch::new(geometry.id(), part.material.clone(), self.transform);
            batch.indexed = geometry.is_indexed();
            batches.push(batch);
        }
    }

    fn process_ray_query(&self, key: DrawableKey, query: &RayOctreeQuery, results: &mut Vec<RayQueryResult>) {
        let bounds_distance = query.ray.hit_distance_box(&self.world_bounding_box());
        if bounds_distance >= query.max_distance {
            return;
        }

        match query.level {
            RayQueryLevel::Aabb => results.push(RayQueryResult {
                position: query.ray.point_at(bounds_distance),
                normal: -query.ray.direction,
                distance: bounds_distance,
                drawable: key,
                sub_object: None,
            }),
            RayQueryLevel::Triangle => {
                let mut closest: Option<(f32, glam::Vec3, usize)> = None;
                for (index, part) in self.parts.iter().enumerate() {
                    let Some(geometry) = part.lods.first() else { continue };
                    if let Some((distance, normal)) = geometry.hit_distance(&query.ray, &self.transform) {
                        if closest.map_or(true, |(best, _, _)| distance < best) {
                            closest = Some((distance, normal, index));
                        }
                    }
                }
                if let Some((distance, normal, index)) = closest {
                    if distance < query.max_distance {
                        results.push(RayQueryResult {
                            position: query.ray.point_at(distance),
                            normal,
                            distance,
                            drawable: key,
                            sub_object: Some(index as u32),
                        });
                    }
                }
            }
        }
    }

    fn num_occluder_triangles(&self) -> u32 {
        self.parts
            .iter()
            .filter(|part| part.occludes())
            .filter_map(|part| self.occlusion_geometry(part))
            .map(|geometry| geometry.num_triangles() as u32)
            .sum()
    }

    fn draw_occlusion(&self, buffer: &mut OcclusionBuffer) -> bool {
        for part in self.parts.iter().filter(|part| part.occludes()) {
            let Some(geometry) = self.occlusion_geometry(part) else { continue };
            if !buffer.add_triangles(&self.transform, geometry.triangles()) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "static_model_tests.rs"]
mod tests;
