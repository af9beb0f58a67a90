//! Shadow module
//!
//! Shadow map sizing and pooling, the atlas layout of shadow splits inside
//! a map, and the construction of the shadow cameras each light renders its
//! casters from.

mod shadow_camera;
mod shadow_map;

pub use shadow_camera::{
    ShadowCameraSplit,
    setup_shadow_cameras, setup_directional_shadow_camera, setup_spot_shadow_camera,
    setup_point_shadow_cameras, quantize_directional_shadow_camera, finalize_shadow_camera,
    is_shadow_caster_visible,
};
pub use shadow_map::{
    ShadowSettings, ShadowMapHandle, ShadowMapAllocator,
    shadow_map_size, shadow_map_viewport,
    DEFAULT_SHADOW_MAP_SIZE, SHADOW_MAX_PIXELS, SHADOW_MIN_PIXELS,
};
