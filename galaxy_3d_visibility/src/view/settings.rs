/// View configuration.

use std::sync::Arc;
use crate::occlusion::DEFAULT_OCCLUSION_BUFFER_SIZE;
use crate::batch::DEFAULT_MAX_SORTED_INSTANCES;
use crate::resource::{Material, MaterialQuality};
use crate::shadow::ShadowSettings;

/// Default occluder triangle budget per frame
pub const DEFAULT_MAX_OCCLUDER_TRIANGLES: u32 = 5000;
/// Default relative screen size below which occluders are dropped
pub const DEFAULT_OCCLUDER_SIZE_THRESHOLD: f32 = 0.025;
/// Default group size at which batches switch to hardware instancing
pub const DEFAULT_MIN_INSTANCES: usize = 2;

#[derive(Debug, Clone)]
pub struct ViewSettings {
    /// Render shadow maps at all
    pub draw_shadows: bool,
    pub shadow: ShadowSettings,
    /// Occluder triangles rasterized per frame; 0 disables occlusion culling
    pub max_occluder_triangles: u32,
    /// Occlusion buffer width in pixels (height follows the aspect ratio)
    pub occlusion_buffer_size: u32,
    /// Occluders smaller than this relative screen size are skipped
    pub occluder_size_threshold: f32,
    /// Group indexed static geometry for hardware instancing
    pub dynamic_instancing: bool,
    pub min_instances: usize,
    /// Instance count up to which group instances are distance sorted
    pub max_sorted_instances: usize,
    pub material_quality: MaterialQuality,
    /// Used by source batches without a material
    pub default_material: Option<Arc<Material>>,
    /// Run visibility checks and light queries on the work queue
    pub threaded: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            draw_shadows: true,
            shadow: ShadowSettings::default(),
            max_occluder_triangles: DEFAULT_MAX_OCCLUDER_TRIANGLES,
            occlusion_buffer_size: DEFAULT_OCCLUSION_BUFFER_SIZE,
            occluder_size_threshold: DEFAULT_OCCLUDER_SIZE_THRESHOLD,
            dynamic_instancing: true,
            min_instances: DEFAULT_MIN_INSTANCES,
            max_sorted_instances: DEFAULT_MAX_SORTED_INSTANCES,
            material_quality: MaterialQuality::High,
            default_material: None,
            threaded: true,
        }
    }
}

impl ViewSettings {
    pub fn validate(mut self) -> Self {
        self.shadow = self.shadow.validate();
        self.occlusion_buffer_size = self.occlusion_buffer_size.max(1);
        self.occluder_size_threshold = self.occluder_size_threshold.max(0.0);
        self.min_instances = self.min_instances.max(1);
        self
    }
}
