/// Shadow maps - sizing, viewport layout and the size-keyed texture pool.
///
/// The pool never owns GPU memory: a `ShadowMapHandle` names a slot that the
/// draw submitter maps to a depth texture of the given size.

use glam::{UVec2, Vec3};
use rustc_hash::FxHashMap;
use crate::camera::Camera;
use crate::math::{BoundingBox, IntRect};
use crate::scene::{Light, LightType};

/// Default shadow map edge length in texels
pub const DEFAULT_SHADOW_MAP_SIZE: u32 = 1024;
/// Smallest shadow map edge length in texels
pub const SHADOW_MIN_PIXELS: u32 = 64;
/// Largest shadow map edge length in texels
pub const SHADOW_MAX_PIXELS: u32 = 16384;

/// Half extent of the view-space box used to size point light maps
const POINT_LIGHT_EXTENT_FACTOR: f32 = 0.58;

/// Shadow quality knobs of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowSettings {
    /// Base edge length; rounded up to a power of two
    pub shadow_map_size: u32,
    /// Render each light's map right before its lit batches, sharing one texture per size
    pub reuse_shadow_maps: bool,
    /// Textures per size when maps are not reused
    pub max_shadow_maps: u32,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            shadow_map_size: DEFAULT_SHADOW_MAP_SIZE,
            reuse_shadow_maps: true,
            max_shadow_maps: 1,
        }
    }
}

impl ShadowSettings {
    pub fn validate(mut self) -> Self {
        self.shadow_map_size = clamp_edge(self.shadow_map_size);
        self.max_shadow_maps = self.max_shadow_maps.max(1);
        self
    }
}

/// A shadow map slot: the texture size and its index within that size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShadowMapHandle {
    pub width: u32,
    pub height: u32,
    pub index: u32,
}

impl ShadowMapHandle {
    pub fn new(width: u32, height: u32, index: u32) -> Self {
        Self { width, height, index }
    }

    /// Pool key of the map size
    pub fn key(&self) -> u64 {
        size_key(self.width, self.height)
    }
}

fn size_key(width: u32, height: u32) -> u64 {
    ((width as u64) << 32) | height as u64
}

/// Power-of-two edge length within `SHADOW_MIN_PIXELS..=SHADOW_MAX_PIXELS`
fn clamp_edge(size: u32) -> u32 {
    size.clamp(SHADOW_MIN_PIXELS, SHADOW_MAX_PIXELS).next_power_of_two()
}

/// Size-keyed pool of shadow map slots.
///
/// Slots are handed out in request order; the view requests them in its
/// sorted light order so the same lights win every frame.
#[derive(Debug, Default)]
pub struct ShadowMapAllocator {
    settings: ShadowSettings,
    /// Maps created so far, per size key
    created: FxHashMap<u64, u32>,
    /// Maps handed out this frame, per size key
    allocated: FxHashMap<u64, u32>,
}

impl ShadowMapAllocator {
    pub fn new(settings: ShadowSettings) -> Self {
        Self {
            settings: settings.validate(),
            created: FxHashMap::default(),
            allocated: FxHashMap::default(),
        }
    }

    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    /// Change the pool policy; drops every created map when it differs
    pub fn set_settings(&mut self, settings: ShadowSettings) {
        let settings = settings.validate();
        if settings != self.settings {
            self.settings = settings;
            self.created.clear();
            self.allocated.clear();
        }
    }

    /// Forget this frame's allocations, keeping created maps
    pub fn reset(&mut self) {
        self.allocated.clear();
    }

    /// Claim a map of the given size; `None` once the pool is exhausted
    pub fn allocate(&mut self, width: u32, height: u32) -> Option<ShadowMapHandle> {
        let key = size_key(width, height);
        let created = self.created.entry(key).or_insert(0);

        if self.settings.reuse_shadow_maps {
            *created = (*created).max(1);
            return Some(ShadowMapHandle::new(width, height, 0));
        }

        let allocated = self.allocated.entry(key).or_insert(0);
        if *allocated >= self.settings.max_shadow_maps {
            return None;
        }
        let index = *allocated;
        *allocated += 1;
        *created = (*created).max(*allocated);
        Some(ShadowMapHandle::new(width, height, index))
    }

    /// Maps created over the pool's lifetime
    pub fn num_shadow_maps(&self) -> u32 {
        self.created.values().sum()
    }

    /// Maps handed out this frame
    pub fn num_allocated(&self) -> u32 {
        self.allocated.values().sum()
    }
}

/// Shadow map size for a light seen from `camera`.
///
/// The base size is scaled by the light's resolution factor; with auto
/// sizing, spot and point lights shrink to the screen area they cover. The
/// result is widened to hold every split of the atlas layout.
pub fn shadow_map_size(light: &Light, camera: &Camera, view_size: UVec2, base_size: u32) -> UVec2 {
    let mut size = base_size as f32 * light.shadow_resolution();

    if light.shadow_focus().auto_size && light.light_type() != LightType::Directional {
        let view = camera.view();
        let light_box = match light.light_type() {
            LightType::Spot => {
                let frustum = light.frustum().transformed(&view);
                BoundingBox::from_points(&frustum.vertices[4..8])
            }
            _ => {
                let center = view.transform_point3(light.position());
                let extent = Vec3::splat(POINT_LIGHT_EXTENT_FACTOR * light.range());
                BoundingBox::from_center_half_size(center, extent)
            }
        };
        let projected = light_box.projected(&camera.projection());
        if projected.is_defined() {
            let projected_size = projected.size();
            let light_pixels = (0.5 * view_size.x as f32 * projected_size.x)
                .max(0.5 * view_size.y as f32 * projected_size.y)
                .max(SHADOW_MIN_PIXELS as f32);
            size = size.min(light_pixels);
        }
    }

    let edge = clamp_edge(size.max(1.0) as u32);
    let (mut width, mut height) = (edge, edge);
    match light.light_type() {
        LightType::Directional => {
            let splits = light.num_shadow_splits();
            if splits > 1 {
                width *= 2;
            }
            if splits > 2 {
                height *= 2;
            }
        }
        LightType::Point => {
            width *= 2;
            height *= 3;
        }
        LightType::Spot => {}
    }
    UVec2::new(width, height)
}

/// Region of a shadow map rendered by one split
pub fn shadow_map_viewport(light: &Light, split: usize, map: &ShadowMapHandle) -> IntRect {
    let width = map.width as i32;
    let height = map.height as i32;
    let split = split as i32;

    match light.light_type() {
        LightType::Directional => match light.num_shadow_splits() {
            1 => IntRect::new(0, 0, width, height),
            2 => IntRect::new(split * width / 2, 0, (split + 1) * width / 2, height),
            _ => {
                let column = split & 1;
                let row = split / 2;
                IntRect::new(
                    column * width / 2,
                    row * height / 2,
                    (column + 1) * width / 2,
                    (row + 1) * height / 2,
                )
            }
        },
        LightType::Spot => IntRect::new(0, 0, width, height),
        LightType::Point => {
            let column = split & 1;
            let row = split / 2;
            IntRect::new(
                column * width / 2,
                row * height / 3,
                (column + 1) * width / 2,
                (row + 1) * height / 3,
            )
        }
    }
}

#[cfg(test)]
#[path = "shadow_map_tests.rs"]
mod tests;
