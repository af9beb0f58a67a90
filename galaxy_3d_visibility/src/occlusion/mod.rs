//! Software occlusion culling
//!
//! Occluder triangles are rasterized into a small depth buffer; a max-depth
//! hierarchy built from it answers conservative visibility tests for
//! octants and drawable bounds.

mod occlusion_buffer;

pub use occlusion_buffer::{OcclusionBuffer, DEFAULT_OCCLUSION_BUFFER_SIZE};
