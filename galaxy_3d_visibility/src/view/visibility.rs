/// Visibility: occluder selection and the per-drawable in-view checks.
///
/// The view's drawable query is split into contiguous chunks; each chunk is
/// checked on the work queue into its own `VisibilityChunk` and the chunks
/// are merged in order on the calling thread.

use glam::Vec3;
use smallvec::SmallVec;
use crate::camera::Camera;
use crate::math::{BoundingBox, Intersection, LARGE_VALUE};
use crate::occlusion::OcclusionBuffer;
use crate::scene::{Drawable, DrawableFlags, DrawableKey, Light, LightType, Octree, SourceBatch, ZoneId};

/// A geometry drawable in view this frame
#[derive(Debug, Clone)]
pub struct VisibleGeometry {
    pub drawable: DrawableKey,
    pub world_box: BoundingBox,
    /// Camera distance of the bounds center
    pub distance: f32,
    pub lod_distance: f32,
    /// View depth range; `LARGE_VALUE` for unbounded geometry
    pub min_z: f32,
    pub max_z: f32,
    pub light_mask: u32,
    pub max_lights: u32,
    pub zone: ZoneId,
    pub batches: Vec<SourceBatch>,
    /// Per-pixel lights, as indices into the view's lights
    pub lights: SmallVec<[usize; 4]>,
    pub vertex_lights: SmallVec<[usize; 4]>,
    /// Source batches (first 32) drawn by a lit base pass
    pub lit_base_mask: u32,
}

impl VisibleGeometry {
    pub fn has_lit_base(&self, batch_index: usize) -> bool {
        batch_index < 32 && self.lit_base_mask & (1 << batch_index) != 0
    }
}

/// A light in view this frame
#[derive(Debug, Clone)]
pub struct VisibleLight {
    pub drawable: DrawableKey,
    pub light: Light,
    /// Camera distance; 0 for directional lights
    pub distance: f32,
    /// Ranking value, lower is brighter or closer
    pub sort_value: f32,
}

/// Result of checking one chunk of the drawable query
#[derive(Debug)]
pub struct VisibilityChunk {
    pub geometries: Vec<VisibleGeometry>,
    pub lights: Vec<VisibleLight>,
    pub min_z: f32,
    pub max_z: f32,
}

impl Default for VisibilityChunk {
    fn default() -> Self {
        Self {
            geometries: Vec::new(),
            lights: Vec::new(),
            min_z: f32::INFINITY,
            max_z: 0.0,
        }
    }
}

/// Beyond a non-zero maximum distance
fn beyond(distance: f32, max_distance: f32) -> bool {
    max_distance > 0.0 && distance > max_distance
}

/// Camera distance and LOD distance of a drawable
pub fn drawable_distances(camera: &Camera, drawable: &dyn Drawable) -> (f32, f32) {
    let distance = camera.distance(drawable.world_bounding_box().center());
    let lod_distance = camera.lod_distance(distance, drawable.world_scale(), drawable.lod_bias());
    (distance, lod_distance)
}

/// Check a chunk of the drawable query result.
///
/// Drawables beyond their draw distance, hidden in the occlusion buffer or
/// (for lights) without any effective color are dropped. Geometry collects
/// its source batches for the LOD distance and extends the view depth range.
pub fn check_visibility(
    octree: &Octree,
    camera: &Camera,
    buffer: Option<&OcclusionBuffer>,
    keys: &[DrawableKey],
    chunk: &mut VisibilityChunk,
) {
    let view = camera.view();
    let view_z = view.row(2).truncate();
    let abs_view_z = view_z.abs();

    for &key in keys {
        let Some(drawable) = octree.drawable(key) else { continue };
        let world_box = drawable.world_bounding_box();

        if let Some(buffer) = buffer {
            if drawable.is_occludee() && !buffer.is_visible(&world_box) {
                continue;
            }
        }

        let flags = drawable.drawable_flags();
        if flags.contains(DrawableFlags::GEOMETRY) {
            let (distance, lod_distance) = drawable_distances(camera, drawable);
            if beyond(distance, drawable.draw_distance()) {
                continue;
            }

            let center = world_box.center();
            let edge = world_box.half_size();
            let (min_z, max_z) = if edge.length_squared() < LARGE_VALUE * LARGE_VALUE {
                let center_z = -view.transform_point3(center).z;
                let edge_z = abs_view_z.dot(edge);
                chunk.min_z = chunk.min_z.min(center_z - edge_z);
                chunk.max_z = chunk.max_z.max(center_z + edge_z);
                (center_z - edge_z, center_z + edge_z)
            } else {
                (LARGE_VALUE, LARGE_VALUE)
            };

            let mut batches = Vec::new();
            drawable.collect_batches(lod_distance, &mut batches);

            chunk.geometries.push(VisibleGeometry {
                drawable: key,
                world_box,
                distance,
                lod_distance,
                min_z,
                max_z,
                light_mask: drawable.light_mask(),
                max_lights: drawable.max_lights(),
                zone: drawable.zone(),
                batches,
                lights: SmallVec::new(),
                vertex_lights: SmallVec::new(),
                lit_base_mask: 0,
            });
        } else if let Some(light) = drawable.as_light() {
            let distance = match light.light_type() {
                LightType::Directional => 0.0,
                _ => camera.distance(light.position()),
            };
            if beyond(distance, drawable.draw_distance()) {
                continue;
            }
            if light.effective_color() == Vec3::ZERO {
                continue;
            }
            chunk.lights.push(VisibleLight {
                drawable: key,
                light: light.clone(),
                distance,
                sort_value: light.intensity_sort_value(distance),
            });
        }
    }
}

/// Relative screen size of an occluder.
///
/// Perspective views favor occluders close to the camera and those the
/// camera is inside of.
pub fn occluder_screen_size(camera: &Camera, drawable: &dyn Drawable, distance: f32) -> f32 {
    let world_box = drawable.world_bounding_box();
    let diagonal = world_box.size().length();
    if camera.is_orthographic() {
        return diagonal / camera.ortho_size();
    }

    let distance = distance.max(f32::EPSILON);
    let max_distance_fraction = distance / camera.far_clip();
    let mut size = diagonal * camera.half_view_size() / (distance * max_distance_fraction);
    if world_box.is_inside_point(camera.position()) != Intersection::Outside {
        size *= diagonal;
    }
    size
}

/// Filter occluders by draw distance and screen size, then order them near to far
pub fn select_occluders(
    octree: &Octree,
    camera: &Camera,
    size_threshold: f32,
    candidates: &[DrawableKey],
) -> Vec<(DrawableKey, f32)> {
    let mut occluders: Vec<(DrawableKey, f32)> = candidates
        .iter()
        .filter_map(|&key| {
            let drawable = octree.drawable(key)?;
            let (distance, _) = drawable_distances(camera, drawable);
            if beyond(distance, drawable.draw_distance()) {
                return None;
            }
            (occluder_screen_size(camera, drawable, distance) >= size_threshold).then_some((key, distance))
        })
        .collect();
    occluders.sort_by(|a, b| a.1.total_cmp(&b.1));
    occluders
}

/// Rasterize occluders into the buffer; returns how many were drawn.
///
/// Every occluder after the first is skipped when already hidden by the
/// ones before it. Drawing stops once the triangle budget runs out.
pub fn draw_occluders(octree: &Octree, buffer: &mut OcclusionBuffer, occluders: &[(DrawableKey, f32)]) -> usize {
    let mut active = 0;
    for (index, (key, _)) in occluders.iter().enumerate() {
        let Some(drawable) = octree.drawable(*key) else { continue };
        if index > 0 && !buffer.is_visible(&drawable.world_bounding_box()) {
            continue;
        }

        active += 1;
        if !drawable.draw_occlusion(buffer) {
            crate::engine_trace!(
                "galaxy3d::View",
                "Occluder triangle budget exhausted after {} occluders",
                active
            );
            break;
        }
    }
    buffer.build_depth_hierarchy();
    active
}

#[cfg(test)]
#[path = "visibility_tests.rs"]
mod tests;
