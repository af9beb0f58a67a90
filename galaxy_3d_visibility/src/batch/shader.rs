/// Shader variations - pass shaders specialized per geometry type and light.
///
/// A variation is identified by the shader name, the permutation flags the
/// view selects for a batch, and free-form extra defines (pass, material and
/// render path command). The cache interns variations into dense `ShaderId`s
/// so batches can carry and compare them cheaply.

use std::sync::Arc;
use bitflags::bitflags;
use rustc_hash::FxHashMap;
use crate::resource::technique::join_defines;
use crate::resource::PassLightingMode;
use crate::scene::{GeometryType, Light, LightType, MAX_VERTEX_LIGHTS};
use super::batch::Batch;

bitflags! {
    /// Permutation flags of a shader variation.
    ///
    /// The vertex light count lives in the bits under `NUM_VERTEX_LIGHTS_MASK`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct ShaderDefines: u32 {
        const SKINNED = 1 << 0;
        const INSTANCED = 1 << 1;
        const BILLBOARD = 1 << 2;
        const PERPIXEL = 1 << 3;
        const DIRLIGHT = 1 << 4;
        const SPOTLIGHT = 1 << 5;
        const POINTLIGHT = 1 << 6;
        const SHADOW = 1 << 7;
        const NORMALOFFSET = 1 << 8;
        const SPECULAR = 1 << 9;
        const NUM_VERTEX_LIGHTS_MASK = 0xf << NUM_VERTEX_LIGHTS_SHIFT;
    }
}

const NUM_VERTEX_LIGHTS_SHIFT: u32 = 16;

const DEFINE_NAMES: [(ShaderDefines, &str); 10] = [
    (ShaderDefines::SKINNED, "SKINNED"),
    (ShaderDefines::INSTANCED, "INSTANCED"),
    (ShaderDefines::BILLBOARD, "BILLBOARD"),
    (ShaderDefines::PERPIXEL, "PERPIXEL"),
    (ShaderDefines::DIRLIGHT, "DIRLIGHT"),
    (ShaderDefines::SPOTLIGHT, "SPOTLIGHT"),
    (ShaderDefines::POINTLIGHT, "POINTLIGHT"),
    (ShaderDefines::SHADOW, "SHADOW"),
    (ShaderDefines::NORMALOFFSET, "NORMALOFFSET"),
    (ShaderDefines::SPECULAR, "SPECULAR"),
];

impl ShaderDefines {
    /// Flags selecting the vertex transform path
    pub fn for_geometry(geometry_type: GeometryType) -> Self {
        match geometry_type {
            GeometryType::Static => ShaderDefines::empty(),
            GeometryType::Skinned => ShaderDefines::SKINNED,
            GeometryType::Instanced => ShaderDefines::INSTANCED,
            GeometryType::Billboard => ShaderDefines::BILLBOARD,
        }
    }

    pub fn for_light_type(light_type: LightType) -> Self {
        match light_type {
            LightType::Directional => ShaderDefines::DIRLIGHT,
            LightType::Spot => ShaderDefines::SPOTLIGHT,
            LightType::Point => ShaderDefines::POINTLIGHT,
        }
    }

    /// Same flags with the vertex light count replaced
    pub fn with_vertex_lights(self, count: usize) -> Self {
        let count = count.min(MAX_VERTEX_LIGHTS) as u32;
        (self - ShaderDefines::NUM_VERTEX_LIGHTS_MASK) | ShaderDefines::from_bits_retain(count << NUM_VERTEX_LIGHTS_SHIFT)
    }

    pub fn num_vertex_lights(self) -> usize {
        ((self & ShaderDefines::NUM_VERTEX_LIGHTS_MASK).bits() >> NUM_VERTEX_LIGHTS_SHIFT) as usize
    }

    /// Space separated define list, e.g. `"INSTANCED PERPIXEL DIRLIGHT"`
    pub fn to_define_string(self) -> String {
        let mut names: Vec<String> = DEFINE_NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| name.to_string())
            .collect();
        let num_vertex_lights = self.num_vertex_lights();
        if num_vertex_lights > 0 {
            names.push(format!("NUMVERTEXLIGHTS={}", num_vertex_lights));
        }
        names.join(" ")
    }
}

/// Dense handle of an interned shader variation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderVariation {
    pub name: Arc<str>,
    pub defines: ShaderDefines,
    pub extra_defines: Arc<str>,
}

impl ShaderVariation {
    /// Permutation flags followed by the extra defines
    pub fn define_string(&self) -> String {
        join_defines(&self.defines.to_define_string(), &self.extra_defines)
    }
}

/// Lighting context used to pick a batch's shader permutation
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchLighting<'a> {
    /// Per-pixel light of the batch's light queue
    pub light: Option<&'a Light>,
    /// The light queue has a shadow map and the batch may sample it
    pub shadowed: bool,
    /// Lights of the batch's vertex light queue
    pub num_vertex_lights: usize,
}

/// Interning table of shader variations
#[derive(Debug, Default)]
pub struct ShaderCache {
    variations: Vec<ShaderVariation>,
    lookup: FxHashMap<ShaderVariation, ShaderId>,
}

impl ShaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a variation and return its id
    pub fn variation(&mut self, name: &Arc<str>, defines: ShaderDefines, extra_defines: &str) -> ShaderId {
        let key = ShaderVariation {
            name: Arc::clone(name),
            defines,
            extra_defines: Arc::from(extra_defines.trim()),
        };
        if let Some(id) = self.lookup.get(&key) {
            return *id;
        }
        let id = ShaderId(self.variations.len() as u32);
        self.variations.push(key.clone());
        self.lookup.insert(key, id);
        id
    }

    pub fn get(&self, id: ShaderId) -> Option<&ShaderVariation> {
        self.variations.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.variations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variations.is_empty()
    }

    pub fn clear(&mut self) {
        self.variations.clear();
        self.lookup.clear();
    }

    /// Pick the vertex and pixel shader variations of a batch.
    ///
    /// `extra` holds the render path command's (vertex, pixel) defines.
    /// A per-pixel pass without a light gets no shaders and is skipped at
    /// draw time.
    pub fn set_batch_shaders(&mut self, batch: &mut Batch, lighting: BatchLighting<'_>, extra: (&str, &str)) {
        let pass = Arc::clone(&batch.pass);
        let geometry_defines = ShaderDefines::for_geometry(batch.geometry_type);

        let (vertex_defines, pixel_defines) = match pass.lighting_mode() {
            PassLightingMode::PerPixel => {
                let Some(light) = lighting.light else {
                    batch.vertex_shader = None;
                    batch.pixel_shader = None;
                    return;
                };
                let light_defines = ShaderDefines::for_light_type(light.light_type()) | ShaderDefines::PERPIXEL;
                let mut vertex = geometry_defines | light_defines;
                let mut pixel = light_defines;
                if light.specular_intensity() > 0.0 {
                    pixel |= ShaderDefines::SPECULAR;
                }
                if lighting.shadowed {
                    vertex |= if light.shadow_bias().normal_offset > 0.0 {
                        ShaderDefines::SHADOW | ShaderDefines::NORMALOFFSET
                    } else {
                        ShaderDefines::SHADOW
                    };
                    pixel |= ShaderDefines::SHADOW;
                }
                (vertex, pixel)
            }
            PassLightingMode::PerVertex => {
                (geometry_defines.with_vertex_lights(lighting.num_vertex_lights), ShaderDefines::empty())
            }
            PassLightingMode::Unlit => (geometry_defines, ShaderDefines::empty()),
        };

        let vertex_extra = join_defines(
            &join_defines(pass.vertex_defines(), batch.material.vertex_defines()),
            extra.0,
        );
        let pixel_extra = join_defines(
            &join_defines(pass.pixel_defines(), batch.material.pixel_defines()),
            extra.1,
        );

        batch.vertex_shader = Some(self.variation(pass.vertex_shader(), vertex_defines, &vertex_extra));
        batch.pixel_shader = Some(self.variation(pass.pixel_shader(), pixel_defines, &pixel_extra));
    }
}

#[cfg(test)]
#[path = "shader_tests.rs"]
mod tests;
