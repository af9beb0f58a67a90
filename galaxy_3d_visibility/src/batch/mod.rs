//! Batch module
//!
//! Draw-call candidates built by the view: batches, instancing groups,
//! the per-pass and per-light queues that sort them, and the shader
//! variation cache they reference.

mod batch;
mod batch_queue;
mod shader;

pub use batch::{Batch, BatchGroup, BatchGroupKey, InstanceData, InstanceTransform, LightQueueId};
pub use batch_queue::{BatchQueue, LightBatchQueue, ShadowBatchQueue, DEFAULT_MAX_SORTED_INSTANCES};
pub use shader::{BatchLighting, ShaderCache, ShaderDefines, ShaderId, ShaderVariation};
