/// Resource-level material type.
///
/// A Material is a list of technique entries (each usable from a quality
/// level and a LOD distance) plus fixed-function state shared by all of
/// its passes. The view picks one technique per drawable and frame.

use std::sync::Arc;
use crate::error::Result;
use crate::engine_bail;
use super::pass::CullMode;
use super::technique::Technique;

/// Default material render order
pub const DEFAULT_RENDER_ORDER: u8 = 128;

/// Material quality setting; higher levels enable more expensive techniques
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MaterialQuality {
    Low = 0,
    Medium = 1,
    High = 2,
}

/// One technique choice of a material
#[derive(Debug, Clone)]
pub struct TechniqueEntry {
    pub technique: Arc<Technique>,
    /// Lowest quality setting this entry is used at
    pub quality_level: MaterialQuality,
    /// Smallest LOD distance this entry is used at
    pub lod_distance: f32,
}

impl TechniqueEntry {
    pub fn new(technique: Arc<Technique>) -> Self {
        Self { technique, quality_level: MaterialQuality::Low, lod_distance: 0.0 }
    }
}

/// Material creation descriptor
#[derive(Debug, Clone)]
pub struct MaterialDesc {
    pub name: String,
    pub techniques: Vec<TechniqueEntry>,
    pub render_order: u8,
    pub cull_mode: CullMode,
    pub shadow_cull_mode: CullMode,
    /// Whether geometry using the material may act as an occluder
    pub occlusion: bool,
    pub vertex_defines: String,
    pub pixel_defines: String,
}

impl MaterialDesc {
    pub fn new(name: &str, technique: Arc<Technique>) -> Self {
        Self {
            name: name.to_string(),
            techniques: vec![TechniqueEntry::new(technique)],
            render_order: DEFAULT_RENDER_ORDER,
            cull_mode: CullMode::Ccw,
            shadow_cull_mode: CullMode::Ccw,
            occlusion: true,
            vertex_defines: String::new(),
            pixel_defines: String::new(),
        }
    }
}

// ===== MATERIAL =====

#[derive(Debug, Clone)]
pub struct Material {
    name: String,
    /// Sorted by decreasing LOD distance, then decreasing quality
    techniques: Vec<TechniqueEntry>,
    render_order: u8,
    cull_mode: CullMode,
    shadow_cull_mode: CullMode,
    occlusion: bool,
    vertex_defines: String,
    pixel_defines: String,
}

impl Material {
    pub fn from_desc(desc: MaterialDesc) -> Result<Self> {
        if desc.techniques.is_empty() {
            engine_bail!(InvalidResource @ "galaxy3d::Material",
                "Material '{}' has no techniques", desc.name);
        }
        if let Some(entry) = desc.techniques.iter().find(|entry| !(entry.lod_distance >= 0.0)) {
            engine_bail!(InvalidResource @ "galaxy3d::Material",
                "Material '{}': technique '{}' has invalid LOD distance {}",
                desc.name, entry.technique.name(), entry.lod_distance);
        }

        let mut techniques = desc.techniques;
        techniques.sort_by(|a, b| {
            b.lod_distance
                .total_cmp(&a.lod_distance)
                .then_with(|| b.quality_level.cmp(&a.quality_level))
        });

        Ok(Self {
            name: desc.name,
            techniques,
            render_order: desc.render_order,
            cull_mode: desc.cull_mode,
            shadow_cull_mode: desc.shadow_cull_mode,
            occlusion: desc.occlusion,
            vertex_defines: desc.vertex_defines,
            pixel_defines: desc.pixel_defines,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn techniques(&self) -> &[TechniqueEntry] {
        &self.techniques
    }

    /// Technique to use at a LOD distance and quality setting.
    ///
    /// Falls back to the last entry when none qualifies.
    pub fn find_technique(&self, lod_distance: f32, quality: MaterialQuality) -> Option<&Arc<Technique>> {
        if let [only] = self.techniques.as_slice() {
            return Some(&only.technique);
        }
        self.techniques
            .iter()
            .find(|entry| quality >= entry.quality_level && lod_distance >= entry.lod_distance)
            .or_else(|| self.techniques.last())
            .map(|entry| &entry.technique)
    }

    pub fn render_order(&self) -> u8 {
        self.render_order
    }

    pub fn cull_mode(&self) -> CullMode {
        self.cull_mode
    }

    pub fn shadow_cull_mode(&self) -> CullMode {
        self.shadow_cull_mode
    }

    pub fn occlusion(&self) -> bool {
        self.occlusion
    }

    pub fn vertex_defines(&self) -> &str {
        &self.vertex_defines
    }

    pub fn pixel_defines(&self) -> &str {
        &self.pixel_defines
    }
}

#[cfg(test)]
#[path = "material_tests.rs"]
mod tests;
