/// Technique - the set of passes a material can render with.
///
/// Passes are stored in a table indexed by `PassIndex`. A pass without its
/// own shaders inherits the technique-level shaders and defines.

use std::sync::Arc;
use crate::error::Result;
use crate::engine_bail;
use super::pass::{Pass, PassDesc, PassIndex, PassRegistry};

/// Technique creation descriptor
#[derive(Debug, Clone, Default)]
pub struct TechniqueDesc {
    pub name: String,
    pub vertex_shader: String,
    pub pixel_shader: String,
    pub vertex_defines: String,
    pub pixel_defines: String,
    pub passes: Vec<PassDesc>,
}

#[derive(Debug, Clone)]
pub struct Technique {
    name: String,
    passes: Vec<Option<Arc<Pass>>>,
}

impl Technique {
    /// Resolve a technique, registering its pass names
    pub fn from_desc(desc: TechniqueDesc, registry: &mut PassRegistry) -> Result<Self> {
        let mut passes: Vec<Option<Arc<Pass>>> = Vec::new();

        for pass_desc in desc.passes {
            let index = registry.index(&pass_desc.name);
            if passes.get(index.as_usize()).is_some_and(Option::is_some) {
                engine_bail!(InvalidResource @ "galaxy3d::Technique",
                    "Technique '{}': duplicate pass '{}'", desc.name, pass_desc.name);
            }

            // A pass overriding shaders does not inherit technique-level defines
            let (vertex_shader, vertex_defines) = if pass_desc.vertex_shader.is_empty() {
                (desc.vertex_shader.as_str(), join_defines(&desc.vertex_defines, &pass_desc.vertex_defines))
            } else {
                (pass_desc.vertex_shader.as_str(), pass_desc.vertex_defines.clone())
            };
            let (pixel_shader, pixel_defines) = if pass_desc.pixel_shader.is_empty() {
                (desc.pixel_shader.as_str(), join_defines(&desc.pixel_defines, &pass_desc.pixel_defines))
            } else {
                (pass_desc.pixel_shader.as_str(), pass_desc.pixel_defines.clone())
            };

            if vertex_shader.is_empty() || pixel_shader.is_empty() {
                engine_bail!(InvalidResource @ "galaxy3d::Technique",
                    "Technique '{}': pass '{}' has no shaders", desc.name, pass_desc.name);
            }

            let pass = Pass::new(
                pass_desc.clone(),
                index,
                Arc::from(vertex_shader),
                Arc::from(pixel_shader),
                Arc::from(vertex_defines.as_str()),
                Arc::from(pixel_defines.as_str()),
            );

            if passes.len() <= index.as_usize() {
                passes.resize(index.as_usize() + 1, None);
            }
            passes[index.as_usize()] = Some(Arc::new(pass));
        }

        Ok(Self { name: desc.name, passes })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_pass(&self, index: PassIndex) -> bool {
        self.pass(index).is_some()
    }

    pub fn pass(&self, index: PassIndex) -> Option<&Arc<Pass>> {
        self.passes.get(index.as_usize())?.as_ref()
    }

    pub fn num_passes(&self) -> usize {
        self.passes.iter().flatten().count()
    }

    pub fn passes(&self) -> impl Iterator<Item = &Arc<Pass>> {
        self.passes.iter().flatten()
    }
}

pub(crate) fn join_defines(base: &str, extra: &str) -> String {
    match (base.trim().is_empty(), extra.trim().is_empty()) {
        (true, _) => extra.trim().to_string(),
        (_, true) => base.trim().to_string(),
        _ => format!("{} {}", base.trim(), extra.trim()),
    }
}

#[cfg(test)]
#[path = "technique_tests.rs"]
mod tests;
