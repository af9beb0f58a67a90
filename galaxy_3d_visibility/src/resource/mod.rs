//! Resource module
//!
//! Passes, techniques, materials and geometry descriptions consumed
//! read-only by the view when building batches.

pub mod pass;
pub mod technique;
pub mod material;
pub mod geometry;

pub use pass::{
    PassIndex, PassRegistry, Pass, PassDesc,
    PassLightingMode, BlendMode, CompareMode, CullMode,
};
pub use technique::{Technique, TechniqueDesc};
pub use material::{Material, MaterialDesc, MaterialQuality, TechniqueEntry, DEFAULT_RENDER_ORDER};
pub use geometry::{Geometry, GeometryDesc, GeometryId};
