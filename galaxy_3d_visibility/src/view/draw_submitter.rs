/// Draw submission - the boundary between the view and the graphics layer.
///
/// `View::render` walks the render path and hands fully resolved batches to
/// a `DrawSubmitter`; binding pipelines, uploading the instancing stream and
/// issuing the actual draw calls is the submitter's business.

use glam::{Mat4, Vec4};
use smallvec::SmallVec;
use crate::batch::{Batch, BatchGroup, InstanceTransform, ShaderCache};
use crate::camera::Camera;
use crate::error::Result;
use crate::math::IntRect;
use crate::render_path::{ClearFlags, RenderPathCommand};
use crate::scene::{Light, MAX_VERTEX_LIGHTS};
use crate::shadow::ShadowMapHandle;

/// Everything a draw call needs beyond the batch itself
#[derive(Debug, Clone)]
pub struct DrawContext<'a> {
    /// View camera, or the shadow camera while rendering a shadow map
    pub camera: &'a Camera,
    /// Resolves the batch's `ShaderId`s
    pub shaders: &'a ShaderCache,
    /// Per-pixel light of the batch's light queue
    pub light: Option<&'a Light>,
    /// Shadow map the batch samples
    pub shadow_map: Option<ShadowMapHandle>,
    pub vertex_lights: SmallVec<[&'a Light; MAX_VERTEX_LIGHTS]>,
    /// Write the batch light mask to the stencil buffer
    pub mark_to_stencil: bool,
    /// Instancing stream of the frame; groups index it with `start_index`
    pub instancing_stream: &'a [InstanceTransform],
}

impl<'a> DrawContext<'a> {
    pub fn new(camera: &'a Camera, shaders: &'a ShaderCache, instancing_stream: &'a [InstanceTransform]) -> Self {
        Self {
            camera,
            shaders,
            light: None,
            shadow_map: None,
            vertex_lights: SmallVec::new(),
            mark_to_stencil: false,
            instancing_stream,
        }
    }
}

/// Receiver of the render commands produced by `View::render`
pub trait DrawSubmitter {
    /// Bind the named render targets
    fn set_render_targets(&mut self, outputs: &[String]) -> Result<()>;

    fn clear(&mut self, flags: ClearFlags, color: Vec4, depth: f32, stencil: u32) -> Result<()>;

    /// Bind and clear a shadow map as the depth target
    fn begin_shadow_map(&mut self, shadow_map: &ShadowMapHandle) -> Result<()>;

    /// Restrict rendering to one split of the bound shadow map
    fn set_shadow_split(&mut self, viewport: IntRect, camera: &Camera) -> Result<()>;

    /// Draw a batch with explicit world (or bone) transforms
    fn draw_batch(&mut self, batch: &Batch, transforms: &[Mat4], context: &DrawContext<'_>) -> Result<()>;

    /// Draw an instanced group from the instancing stream
    fn draw_batch_group(&mut self, group: &BatchGroup, context: &DrawContext<'_>) -> Result<()>;

    fn draw_fullscreen_quad(&mut self, command: &RenderPathCommand) -> Result<()>;
}
