/// Drawable - the capability set every object stored in the octree exposes.
///
/// Object kinds (static models, skinned models, lights, custom types) are
/// plain structs implementing `Drawable`. The octree owns them and hands
/// out `DrawableKey`s; the view reads them through `&dyn Drawable`.

use std::any::Any;
use std::sync::{Arc, Mutex};
use bitflags::bitflags;
use glam::{Mat4, Vec3};
use slotmap::new_key_type;
use smallvec::SmallVec;
use crate::math::BoundingBox;
use crate::occlusion::OcclusionBuffer;
use crate::resource::{GeometryId, Material};
use super::light::Light;
use super::octree_query::{RayOctreeQuery, RayQueryResult};

new_key_type! {
    /// Stable handle to a drawable stored in an `Octree`
    pub struct DrawableKey;
}

bitflags! {
    /// Drawable categories, used to filter queries before exact tests
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DrawableFlags: u8 {
        const GEOMETRY = 0x1;
        const LIGHT = 0x2;
        const ZONE = 0x4;
        const PROXY_GEOMETRY = 0x8;
    }
}

/// Identifier of the zone (ambient environment) a drawable belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ZoneId(pub u32);

/// Per-frame timing shared with drawable updates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameInfo {
    pub frame_number: u32,
    pub time_step: f32,
}

/// How a batch's vertex data is transformed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    /// One world transform
    Static,
    /// Bone palette
    Skinned,
    /// Per-instance transforms from the instancing stream
    Instanced,
    /// Camera-facing quads
    Billboard,
}

/// One renderable part of a drawable, as reported for the current frame
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub geometry: GeometryId,
    pub geometry_type: GeometryType,
    /// Index data present (required for hardware instancing)
    pub indexed: bool,
    /// `None` falls back to the view's default material
    pub material: Option<Arc<Material>>,
    pub transforms: SmallVec<[Mat4; 1]>,
}

impl SourceBatch {
    pub fn new(geometry: GeometryId, material: Option<Arc<Material>>, transform: Mat4) -> Self {
        let mut transforms = SmallVec::new();
        transforms.push(transform);
        Self {
            geometry,
            geometry_type: GeometryType::Static,
            indexed: true,
            material,
            transforms,
        }
    }
}

/// Context handed to `Drawable::update`
///
/// Requests made through `queue_update` go to a mutex-protected side list
/// that the octree merges on the main thread once all workers are done.
pub struct UpdateContext<'a> {
    frame: &'a FrameInfo,
    requests: &'a Mutex<Vec<DrawableKey>>,
}

impl<'a> UpdateContext<'a> {
    pub(crate) fn new(frame: &'a FrameInfo, requests: &'a Mutex<Vec<DrawableKey>>) -> Self {
        Self { frame, requests }
    }

    pub fn frame(&self) -> &FrameInfo {
        self.frame
    }

    /// Ask for another drawable to be updated and reinserted this frame
    pub fn queue_update(&self, key: DrawableKey) {
        let mut requests = self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        requests.push(key);
    }
}

/// Capability set of an object stored in the octree
pub trait Drawable: Send + Sync {
    /// Current world-space bounds
    fn world_bounding_box(&self) -> BoundingBox;

    fn drawable_flags(&self) -> DrawableFlags {
        DrawableFlags::GEOMETRY
    }

    /// Compared against the camera view mask
    fn view_mask(&self) -> u32 {
        u32::MAX
    }

    /// Compared against light masks
    fn light_mask(&self) -> u32 {
        u32::MAX
    }

    /// Compared against shadow-casting light masks
    fn shadow_mask(&self) -> u32 {
        u32::MAX
    }

    fn zone(&self) -> ZoneId {
        ZoneId::default()
    }

    /// May be rasterized into the occlusion buffer
    fn is_occluder(&self) -> bool {
        false
    }

    /// May be hidden by occluders; non-occludees are kept at the octree root
    fn is_occludee(&self) -> bool {
        true
    }

    fn cast_shadows(&self) -> bool {
        false
    }

    /// Maximum camera distance, 0 = unlimited
    fn draw_distance(&self) -> f32 {
        0.0
    }

    /// Maximum camera distance for shadow casting, 0 = unlimited
    fn shadow_distance(&self) -> f32 {
        0.0
    }

    fn lod_bias(&self) -> f32 {
        1.0
    }

    /// Maximum per-pixel lights, 0 = unlimited
    fn max_lights(&self) -> u32 {
        0
    }

    /// Largest world scale component, used for LOD distance
    fn world_scale(&self) -> f32 {
        1.0
    }

    /// Per-frame self update, run before reinsertion.
    ///
    /// May run on a worker thread; must only mutate `self`.
    fn update(&mut self, _context: &UpdateContext<'_>) {}

    /// Append the batches to draw at the given LOD distance
    fn collect_batches(&self, _lod_distance: f32, _batches: &mut Vec<SourceBatch>) {}

    /// Exact ray test. The default reports a hit on the world bounds.
    fn process_ray_query(&self, key: DrawableKey, query: &RayOctreeQuery, results: &mut Vec<RayQueryResult>) {
        let distance = query.ray.hit_distance_box(&self.world_bounding_box());
        if distance < query.max_distance {
            results.push(RayQueryResult {
                position: query.ray.point_at(distance),
                normal: -query.ray.direction,
                distance,
                drawable: key,
                sub_object: None,
            });
        }
    }

    fn num_occluder_triangles(&self) -> u32 {
        0
    }

    /// Rasterize occluder triangles; false once the buffer budget is exhausted
    fn draw_occlusion(&self, _buffer: &mut OcclusionBuffer) -> bool {
        true
    }

    /// Light parameters for light drawables
    fn as_light(&self) -> Option<&Light> {
        None
    }
}

/// Object-safe bridge adding downcasting to any `Drawable`
pub(crate) trait DrawableObject: Drawable {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn as_drawable(&self) -> &dyn Drawable;
    fn as_drawable_mut(&mut self) -> &mut dyn Drawable;
    fn into_drawable(self: Box<Self>) -> Box<dyn Drawable>;
}

impl<T: Drawable + 'static> DrawableObject for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_drawable(&self) -> &dyn Drawable {
        self
    }

    fn as_drawable_mut(&mut self) -> &mut dyn Drawable {
        self
    }

    fn into_drawable(self: Box<Self>) -> Box<dyn Drawable> {
        self
    }
}

/// Largest absolute scale component of an affine transform
pub fn max_scale(transform: &Mat4) -> f32 {
    let scale = Vec3::new(
        transform.x_axis.truncate().length(),
        transform.y_axis.truncate().length(),
        transform.z_axis.truncate().length(),
    );
    scale.max_element()
}
