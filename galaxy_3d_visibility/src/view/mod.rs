//! View module
//!
//! Per-camera frame processing: occlusion, visibility checks, light
//! queries, shadow splits and batch queues, plus the submission boundary
//! towards a graphics backend.

mod draw_submitter;
mod light_query;
mod settings;
mod view;
mod visibility;

pub use draw_submitter::{DrawContext, DrawSubmitter};
pub use light_query::{process_light, LightQueryContext, LightQueryResult, ShadowSplitResult};
pub use settings::{
    ViewSettings, DEFAULT_MAX_OCCLUDER_TRIANGLES, DEFAULT_MIN_INSTANCES, DEFAULT_OCCLUDER_SIZE_THRESHOLD,
};
pub use view::View;
pub use visibility::{
    check_visibility, draw_occluders, drawable_distances, occluder_screen_size, select_occluders,
    VisibilityChunk, VisibleGeometry, VisibleLight,
};
