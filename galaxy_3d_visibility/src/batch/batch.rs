/// Batch - one candidate draw call, and batch groups for instancing.
///
/// A batch is built from a drawable's `SourceBatch` once the view has
/// resolved the technique pass to draw it with. Batches sharing zone, light
/// queue, pass, material, geometry and render order collapse into a
/// `BatchGroup` that is drawn with hardware instancing once it holds enough
/// instances.

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use smallvec::SmallVec;
use crate::resource::{GeometryId, Material, Pass};
use crate::scene::{DrawableKey, GeometryType, SourceBatch, ZoneId};
use super::shader::ShaderId;

/// Sort key bit set on batches that are not the object's base pass
const NON_BASE_SHADER_BIT: u64 = 0x8000;

/// Light queue a batch is lit by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightQueueId {
    /// Index into the view's per-pixel light queues
    Pixel(u16),
    /// Index into the view's vertex light queues
    Vertex(u16),
}

impl LightQueueId {
    /// 16-bit id used in the state sort key (0 = no light queue)
    pub fn sort_id(queue: Option<LightQueueId>) -> u16 {
        match queue {
            None => 0,
            Some(LightQueueId::Pixel(index)) => (index & 0x7fff).wrapping_add(1) & 0x7fff,
            Some(LightQueueId::Vertex(index)) => 0x8000 | ((index & 0x7fff).wrapping_add(1) & 0x7fff),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Batch {
    /// State sort key: shader, light queue, material, geometry
    pub sort_key: u64,
    /// Camera distance of the owning drawable
    pub distance: f32,
    pub render_order: u8,
    /// Draws the object fully (unlit base pass or lit base pass)
    pub is_base: bool,
    pub drawable: DrawableKey,
    pub geometry: GeometryId,
    pub geometry_type: GeometryType,
    pub indexed: bool,
    pub material: Arc<Material>,
    pub pass: Arc<Pass>,
    pub zone: ZoneId,
    /// Low 8 bits of the drawable light mask, for stencil marking
    pub light_mask: u8,
    pub light_queue: Option<LightQueueId>,
    pub vertex_shader: Option<ShaderId>,
    pub pixel_shader: Option<ShaderId>,
    /// World transforms; bone transforms for skinned geometry
    pub transforms: SmallVec<[Mat4; 1]>,
}

impl Batch {
    pub fn new(
        source: &SourceBatch,
        drawable: DrawableKey,
        material: Arc<Material>,
        pass: Arc<Pass>,
        distance: f32,
    ) -> Self {
        Self {
            sort_key: 0,
            distance,
            render_order: material.render_order(),
            is_base: false,
            drawable,
            geometry: source.geometry,
            geometry_type: source.geometry_type,
            indexed: source.indexed,
            material,
            pass,
            zone: ZoneId::default(),
            light_mask: u8::MAX,
            light_queue: None,
            vertex_shader: None,
            pixel_shader: None,
            transforms: source.transforms.clone(),
        }
    }

    /// Pack the state sort key.
    ///
    /// Layout: `shader << 48 | light queue << 32 | material << 16 | geometry`,
    /// where the top bit of the shader field is set for non-base batches.
    pub fn calculate_sort_key(&mut self) {
        let vertex = self.vertex_shader.map_or(0, |id| id.0 as u64 + 1);
        let pixel = self.pixel_shader.map_or(0, |id| id.0 as u64 + 1);
        let mut shader = ((vertex << 7) ^ pixel) & 0x7fff;
        if !self.is_base {
            shader |= NON_BASE_SHADER_BIT;
        }
        let light_queue = LightQueueId::sort_id(self.light_queue) as u64;
        let material = material_sort_id(&self.material);
        let geometry = (self.geometry.0 & 0xffff) as u64;

        self.sort_key = (shader << 48) | (light_queue << 32) | (material << 16) | geometry;
    }

    /// Drawable with shaders resolved
    pub fn is_drawable(&self) -> bool {
        self.vertex_shader.is_some() && self.pixel_shader.is_some()
    }
}

/// 16-bit material id derived from the shared material's identity
fn material_sort_id(material: &Arc<Material>) -> u64 {
    let address = Arc::as_ptr(material) as usize / std::mem::size_of::<Material>().max(1);
    (address & 0xffff) as u64
}

/// Key under which batches are grouped for instancing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchGroupKey {
    pub zone: ZoneId,
    pub light_queue: Option<LightQueueId>,
    /// Identity of the shared pass
    pub pass: usize,
    /// Identity of the shared material
    pub material: usize,
    pub geometry: GeometryId,
    pub render_order: u8,
}

impl BatchGroupKey {
    pub fn new(batch: &Batch) -> Self {
        Self {
            zone: batch.zone,
            light_queue: batch.light_queue,
            pass: Arc::as_ptr(&batch.pass) as usize,
            material: Arc::as_ptr(&batch.material) as usize,
            geometry: batch.geometry,
            render_order: batch.render_order,
        }
    }
}

/// One instance of a batch group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceData {
    pub transform: Mat4,
    pub distance: f32,
}

/// Batches drawn together, instanced once `min_instances` is reached
#[derive(Debug, Clone)]
pub struct BatchGroup {
    /// Shared state; `transforms` is unused
    pub batch: Batch,
    pub instances: Vec<InstanceData>,
    /// First record in the instancing stream, set by `set_instancing_data`
    pub start_index: Option<u32>,
}

impl BatchGroup {
    pub fn new(mut batch: Batch) -> Self {
        batch.transforms.clear();
        Self { batch, instances: Vec::new(), start_index: None }
    }

    /// Append every world transform of `batch` as an instance
    pub fn add_transforms(&mut self, batch: &Batch) {
        self.instances.extend(batch.transforms.iter().map(|transform| InstanceData {
            transform: *transform,
            distance: batch.distance,
        }));
    }

    pub fn is_instanced(&self) -> bool {
        self.batch.geometry_type == GeometryType::Instanced
    }

    /// Write instance transforms into the instancing stream
    pub fn set_instancing_data(&mut self, stream: &mut Vec<InstanceTransform>) {
        self.start_index = Some(stream.len() as u32);
        stream.extend(self.instances.iter().map(|instance| InstanceTransform::from_mat4(&instance.transform)));
    }
}

/// Instance record of the instancing vertex stream: the top three rows
/// of a world transform
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct InstanceTransform {
    pub rows: [[f32; 4]; 3],
}

impl InstanceTransform {
    pub fn from_mat4(matrix: &Mat4) -> Self {
        let transposed = matrix.transpose();
        Self {
            rows: [
                transposed.x_axis.to_array(),
                transposed.y_axis.to_array(),
                transposed.z_axis.to_array(),
            ],
        }
    }

    /// Raw bytes of an instancing stream, ready for upload
    pub fn as_bytes(stream: &[InstanceTransform]) -> &[u8] {
        bytemuck::cast_slice(stream)
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
