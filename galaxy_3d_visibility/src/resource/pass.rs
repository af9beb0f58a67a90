/// Render passes and the pass-name registry.
///
/// Pass names ("base", "light", "shadow", custom names from the render path)
/// are interned into dense `PassIndex` values so techniques can store their
/// passes in a flat table.

use std::sync::Arc;
use rustc_hash::FxHashMap;

/// Dense index of a pass name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PassIndex(pub u32);

impl PassIndex {
    pub const BASE: PassIndex = PassIndex(0);
    pub const LIT_BASE: PassIndex = PassIndex(1);
    pub const LIGHT: PassIndex = PassIndex(2);
    pub const ALPHA: PassIndex = PassIndex(3);
    pub const LIT_ALPHA: PassIndex = PassIndex(4);
    pub const SHADOW: PassIndex = PassIndex(5);

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

const BUILT_IN_PASSES: [&str; 6] = ["base", "litbase", "light", "alpha", "litalpha", "shadow"];

/// Name to index table for passes
#[derive(Debug, Clone)]
pub struct PassRegistry {
    indices: FxHashMap<String, PassIndex>,
    names: Vec<String>,
}

impl Default for PassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PassRegistry {
    /// Registry holding the built-in passes
    pub fn new() -> Self {
        let mut registry = Self { indices: FxHashMap::default(), names: Vec::new() };
        for name in BUILT_IN_PASSES {
            registry.index(name);
        }
        registry
    }

    /// Index of a pass name, allocating a new one on first use.
    /// Names are case-insensitive.
    pub fn index(&mut self, name: &str) -> PassIndex {
        let key = name.to_ascii_lowercase();
        if let Some(index) = self.indices.get(&key) {
            return *index;
        }
        let index = PassIndex(self.names.len() as u32);
        self.names.push(key.clone());
        self.indices.insert(key, index);
        index
    }

    /// Index of an already registered pass name
    pub fn find(&self, name: &str) -> Option<PassIndex> {
        self.indices.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn name(&self, index: PassIndex) -> Option<&str> {
        self.names.get(index.as_usize()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ===== PASS STATE =====

/// Lighting permutation a pass is compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassLightingMode {
    Unlit,
    PerVertex,
    PerPixel,
}

impl PassLightingMode {
    /// Mode implied by a built-in pass name
    pub fn from_pass_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "base" | "alpha" | "material" | "deferred" => PassLightingMode::PerVertex,
            "litbase" | "light" | "litalpha" => PassLightingMode::PerPixel,
            _ => PassLightingMode::Unlit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Replace,
    Add,
    Multiply,
    Alpha,
    AddAlpha,
    PremulAlpha,
    Subtract,
}

impl BlendMode {
    /// Whether the pass needs back-to-front ordering
    pub fn is_transparent(self) -> bool {
        !matches!(self, BlendMode::Replace)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareMode {
    Always,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Ccw,
    Cw,
}

/// Pass creation descriptor
#[derive(Debug, Clone)]
pub struct PassDesc {
    pub name: String,
    pub blend_mode: BlendMode,
    pub depth_test: CompareMode,
    pub depth_write: bool,
    /// `None` derives the mode from the pass name
    pub lighting_mode: Option<PassLightingMode>,
    /// Empty names inherit the technique's shaders
    pub vertex_shader: String,
    pub pixel_shader: String,
    pub vertex_defines: String,
    pub pixel_defines: String,
    /// Overrides the material cull mode when set
    pub cull_mode: Option<CullMode>,
}

impl PassDesc {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            blend_mode: BlendMode::Replace,
            depth_test: CompareMode::LessEqual,
            depth_write: true,
            lighting_mode: None,
            vertex_shader: String::new(),
            pixel_shader: String::new(),
            vertex_defines: String::new(),
            pixel_defines: String::new(),
            cull_mode: None,
        }
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_depth_write(mut self, depth_write: bool) -> Self {
        self.depth_write = depth_write;
        self
    }

    pub fn with_shaders(mut self, vertex_shader: &str, pixel_shader: &str) -> Self {
        self.vertex_shader = vertex_shader.to_string();
        self.pixel_shader = pixel_shader.to_string();
        self
    }
}

/// Fully resolved pass of a technique
#[derive(Debug, Clone, PartialEq)]
pub struct Pass {
    name: String,
    index: PassIndex,
    blend_mode: BlendMode,
    depth_test: CompareMode,
    depth_write: bool,
    lighting_mode: PassLightingMode,
    vertex_shader: Arc<str>,
    pixel_shader: Arc<str>,
    vertex_defines: Arc<str>,
    pixel_defines: Arc<str>,
    cull_mode: Option<CullMode>,
}

impl Pass {
    pub(crate) fn new(
        desc: PassDesc,
        index: PassIndex,
        vertex_shader: Arc<str>,
        pixel_shader: Arc<str>,
        vertex_defines: Arc<str>,
        pixel_defines: Arc<str>,
    ) -> Self {
        let lighting_mode = desc.lighting_mode.unwrap_or_else(|| PassLightingMode::from_pass_name(&desc.name));
        Self {
            name: desc.name.to_ascii_lowercase(),
            index,
            blend_mode: desc.blend_mode,
            depth_test: desc.depth_test,
            depth_write: desc.depth_write,
            lighting_mode,
            vertex_shader,
            pixel_shader,
            vertex_defines,
            pixel_defines,
            cull_mode: desc.cull_mode,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> PassIndex {
        self.index
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn depth_test(&self) -> CompareMode {
        self.depth_test
    }

    pub fn depth_write(&self) -> bool {
        self.depth_write
    }

    pub fn lighting_mode(&self) -> PassLightingMode {
        self.lighting_mode
    }

    pub fn vertex_shader(&self) -> &Arc<str> {
        &self.vertex_shader
    }

    pub fn pixel_shader(&self) -> &Arc<str> {
        &self.pixel_shader
    }

    pub fn vertex_defines(&self) -> &str {
        &self.vertex_defines
    }

    pub fn pixel_defines(&self) -> &str {
        &self.pixel_defines
    }

    pub fn cull_mode(&self) -> Option<CullMode> {
        self.cull_mode
    }
}
