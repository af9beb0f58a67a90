//! Scene module
//!
//! Drawable objects, the octree that owns and spatially indexes them, and
//! the query predicates run against it.

mod drawable;
mod light;
mod octree;
mod octree_query;
mod skinned_model;
mod static_model;

pub use drawable::{
    Drawable, DrawableKey, DrawableFlags, ZoneId,
    FrameInfo, GeometryType, SourceBatch, UpdateContext, max_scale,
};
pub use light::{
    Light, LightType, BiasParameters, CascadeParameters, FocusParameters,
    MAX_LIGHT_SPLITS, MAX_CASCADE_SPLITS, SHADOW_MIN_QUANTIZE, SHADOW_MIN_VIEW, LIGHT_MIN_NEAR_CLIP,
    MAX_VERTEX_LIGHTS,
};
pub use octree::{
    Octree, OctreeDesc, Octant, OctantIndex, DrawableAccess, UpdateFinishedHook,
    DEFAULT_OCTREE_SIZE, DEFAULT_OCTREE_LEVELS, NUM_OCTANTS, ROOT_INDEX,
};
pub use octree_query::{
    OctreeQuery, PointOctreeQuery, SphereOctreeQuery, BoxOctreeQuery, FrustumOctreeQuery,
    AllContentOctreeQuery, OccluderOctreeQuery, OccludedFrustumOctreeQuery, ShadowCasterOctreeQuery,
    RayOctreeQuery, RayQueryLevel, RayQueryResult,
};
pub use skinned_model::{SkinnedModel, Bone};
pub use static_model::{StaticModel, ModelPart};
