/// Octree query predicates.
///
/// A volume query classifies octant culling boxes (pruning whole subtrees
/// when `Outside`, accepting them wholesale when `Inside`) and then filters
/// the drawables held by each visited octant.

use glam::Vec3;
use crate::math::{BoundingBox, Frustum, Intersection, Ray, Sphere};
use crate::occlusion::OcclusionBuffer;
use super::drawable::{Drawable, DrawableFlags, DrawableKey};

/// Predicate driving `Octree::get_drawables`
pub trait OctreeQuery {
    /// Classify an octant culling box; `inside` is true when an ancestor was fully inside
    fn test_octant(&mut self, bounds: &BoundingBox, inside: bool) -> Intersection;

    /// Filter the drawables held by one octant
    fn test_drawables(&mut self, drawables: &mut dyn Iterator<Item = (DrawableKey, &dyn Drawable)>, inside: bool);
}

/// Category, view mask and bounds sanity shared by all volume queries
fn accepts(drawable: &dyn Drawable, flags: DrawableFlags, view_mask: u32) -> bool {
    drawable.drawable_flags().intersects(flags)
        && drawable.view_mask() & view_mask != 0
        && drawable.world_bounding_box().is_valid()
}

// ===== POINT =====

pub struct PointOctreeQuery<'a> {
    result: &'a mut Vec<DrawableKey>,
    point: Vec3,
    flags: DrawableFlags,
    view_mask: u32,
}

impl<'a> PointOctreeQuery<'a> {
    pub fn new(result: &'a mut Vec<DrawableKey>, point: Vec3, flags: DrawableFlags, view_mask: u32) -> Self {
        Self { result, point, flags, view_mask }
    }
}

impl OctreeQuery for PointOctreeQuery<'_> {
    fn test_octant(&mut self, bounds: &BoundingBox, inside: bool) -> Intersection {
        if inside { Intersection::Inside } else { bounds.is_inside_point(self.point) }
    }

    fn test_drawables(&mut self, drawables: &mut dyn Iterator<Item = (DrawableKey, &dyn Drawable)>, _inside: bool) {
        for (key, drawable) in drawables {
            if accepts(drawable, self.flags, self.view_mask)
                && drawable.world_bounding_box().is_inside_point(self.point) != Intersection::Outside
            {
                self.result.push(key);
            }
        }
    }
}

// ===== SPHERE =====

pub struct SphereOctreeQuery<'a> {
    result: &'a mut Vec<DrawableKey>,
    sphere: Sphere,
    flags: DrawableFlags,
    view_mask: u32,
}

impl<'a> SphereOctreeQuery<'a> {
    pub fn new(result: &'a mut Vec<DrawableKey>, sphere: Sphere, flags: DrawableFlags, view_mask: u32) -> Self {
        Self { result, sphere, flags, view_mask }
    }
}

impl OctreeQuery for SphereOctreeQuery<'_> {
    fn test_octant(&mut self, bounds: &BoundingBox, inside: bool) -> Intersection {
        if inside { Intersection::Inside } else { self.sphere.is_inside_box(bounds) }
    }

    fn test_drawables(&mut self, drawables: &mut dyn Iterator<Item = (DrawableKey, &dyn Drawable)>, inside: bool) {
        for (key, drawable) in drawables {
            if accepts(drawable, self.flags, self.view_mask)
                && (inside || self.sphere.is_inside_box_fast(&drawable.world_bounding_box()) != Intersection::Outside)
            {
                self.result.push(key);
            }
        }
    }
}

// ===== BOX =====

pub struct BoxOctreeQuery<'a> {
    result: &'a mut Vec<DrawableKey>,
    bounds: BoundingBox,
    flags: DrawableFlags,
    view_mask: u32,
}

impl<'a> BoxOctreeQuery<'a> {
    pub fn new(result: &'a mut Vec<DrawableKey>, bounds: BoundingBox, flags: DrawableFlags, view_mask: u32) -> Self {
        Self { result, bounds, flags, view_mask }
    }
}

impl OctreeQuery for BoxOctreeQuery<'_> {
    fn test_octant(&mut self, bounds: &BoundingBox, inside: bool) -> Intersection {
        if inside { Intersection::Inside } else { self.bounds.is_inside_box(bounds) }
    }

    fn test_drawables(&mut self, drawables: &mut dyn Iterator<Item = (DrawableKey, &dyn Drawable)>, inside: bool) {
        for (key, drawable) in drawables {
            if accepts(drawable, self.flags, self.view_mask)
                && (inside || self.bounds.is_inside_box_fast(&drawable.world_bounding_box()) != Intersection::Outside)
            {
                self.result.push(key);
            }
        }
    }
}

// ===== FRUSTUM =====

pub struct FrustumOctreeQuery<'a> {
    result: &'a mut Vec<DrawableKey>,
    frustum: Frustum,
    flags: DrawableFlags,
    view_mask: u32,
}

impl<'a> FrustumOctreeQuery<'a> {
    pub fn new(result: &'a mut Vec<DrawableKey>, frustum: Frustum, flags: DrawableFlags, view_mask: u32) -> Self {
        Self { result, frustum, flags, view_mask }
    }
}

impl OctreeQuery for FrustumOctreeQuery<'_> {
    fn test_octant(&mut self, bounds: &BoundingBox, inside: bool) -> Intersection {
        if inside { Intersection::Inside } else { self.frustum.is_inside_box(bounds) }
    }

    fn test_drawables(&mut self, drawables: &mut dyn Iterator<Item = (DrawableKey, &dyn Drawable)>, inside: bool) {
        for (key, drawable) in drawables {
            if accepts(drawable, self.flags, self.view_mask)
                && (inside || self.frustum.is_inside_box_fast(&drawable.world_bounding_box()) != Intersection::Outside)
            {
                self.result.push(key);
            }
        }
    }
}

// ===== ALL CONTENT =====

/// Every drawable matching the category and view mask
pub struct AllContentOctreeQuery<'a> {
    result: &'a mut Vec<DrawableKey>,
    flags: DrawableFlags,
    view_mask: u32,
}

impl<'a> AllContentOctreeQuery<'a> {
    pub fn new(result: &'a mut Vec<DrawableKey>, flags: DrawableFlags, view_mask: u32) -> Self {
        Self { result, flags, view_mask }
    }
}

impl OctreeQuery for AllContentOctreeQuery<'_> {
    fn test_octant(&mut self, _bounds: &BoundingBox, _inside: bool) -> Intersection {
        Intersection::Inside
    }

    fn test_drawables(&mut self, drawables: &mut dyn Iterator<Item = (DrawableKey, &dyn Drawable)>, _inside: bool) {
        for (key, drawable) in drawables {
            if accepts(drawable, self.flags, self.view_mask) {
                self.result.push(key);
            }
        }
    }
}

// ===== OCCLUDERS =====

/// Occluder-flagged geometry inside a frustum
pub struct OccluderOctreeQuery<'a> {
    result: &'a mut Vec<DrawableKey>,
    frustum: Frustum,
    view_mask: u32,
}

impl<'a> OccluderOctreeQuery<'a> {
    pub fn new(result: &'a mut Vec<DrawableKey>, frustum: Frustum, view_mask: u32) -> Self {
        Self { result, frustum, view_mask }
    }
}

impl OctreeQuery for OccluderOctreeQuery<'_> {
    fn test_octant(&mut self, bounds: &BoundingBox, inside: bool) -> Intersection {
        if inside { Intersection::Inside } else { self.frustum.is_inside_box(bounds) }
    }

    fn test_drawables(&mut self, drawables: &mut dyn Iterator<Item = (DrawableKey, &dyn Drawable)>, inside: bool) {
        for (key, drawable) in drawables {
            if drawable.is_occluder()
                && accepts(drawable, DrawableFlags::GEOMETRY, self.view_mask)
                && (inside || self.frustum.is_inside_box_fast(&drawable.world_bounding_box()) != Intersection::Outside)
            {
                self.result.push(key);
            }
        }
    }
}

/// Frustum query that also rejects octants hidden in the occlusion buffer
pub struct OccludedFrustumOctreeQuery<'a> {
    result: &'a mut Vec<DrawableKey>,
    frustum: Frustum,
    buffer: &'a OcclusionBuffer,
    flags: DrawableFlags,
    view_mask: u32,
}

impl<'a> OccludedFrustumOctreeQuery<'a> {
    pub fn new(
        result: &'a mut Vec<DrawableKey>,
        frustum: Frustum,
        buffer: &'a OcclusionBuffer,
        flags: DrawableFlags,
        view_mask: u32,
    ) -> Self {
        Self { result, frustum, buffer, flags, view_mask }
    }
}

impl OctreeQuery for OccludedFrustumOctreeQuery<'_> {
    fn test_octant(&mut self, bounds: &BoundingBox, inside: bool) -> Intersection {
        if inside {
            return if self.buffer.is_visible(bounds) { Intersection::Inside } else { Intersection::Outside };
        }
        let result = self.frustum.is_inside_box(bounds);
        if result != Intersection::Outside && !self.buffer.is_visible(bounds) {
            Intersection::Outside
        } else {
            result
        }
    }

    fn test_drawables(&mut self, drawables: &mut dyn Iterator<Item = (DrawableKey, &dyn Drawable)>, inside: bool) {
        for (key, drawable) in drawables {
            if accepts(drawable, self.flags, self.view_mask)
                && (inside || self.frustum.is_inside_box_fast(&drawable.world_bounding_box()) != Intersection::Outside)
            {
                self.result.push(key);
            }
        }
    }
}

// ===== SHADOW CASTERS =====

/// Shadow-casting geometry inside a shadow camera frustum
pub struct ShadowCasterOctreeQuery<'a> {
    result: &'a mut Vec<DrawableKey>,
    frustum: Frustum,
    view_mask: u32,
}

impl<'a> ShadowCasterOctreeQuery<'a> {
    pub fn new(result: &'a mut Vec<DrawableKey>, frustum: Frustum, view_mask: u32) -> Self {
        Self { result, frustum, view_mask }
    }
}

impl OctreeQuery for ShadowCasterOctreeQuery<'_> {
    fn test_octant(&mut self, bounds: &BoundingBox, inside: bool) -> Intersection {
        if inside { Intersection::Inside } else { self.frustum.is_inside_box(bounds) }
    }

    fn test_drawables(&mut self, drawables: &mut dyn Iterator<Item = (DrawableKey, &dyn Drawable)>, inside: bool) {
        for (key, drawable) in drawables {
            if drawable.cast_shadows()
                && accepts(drawable, DrawableFlags::GEOMETRY, self.view_mask)
                && (inside || self.frustum.is_inside_box_fast(&drawable.world_bounding_box()) != Intersection::Outside)
            {
                self.result.push(key);
            }
        }
    }
}

// ===== RAYS =====

/// Precision of a ray query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayQueryLevel {
    /// Hit the world bounding box
    Aabb,
    /// Hit actual triangles where the drawable supports it
    Triangle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayOctreeQuery {
    pub ray: Ray,
    pub level: RayQueryLevel,
    pub max_distance: f32,
    pub drawable_flags: DrawableFlags,
    pub view_mask: u32,
}

impl RayOctreeQuery {
    /// Triangle-level query against all geometry, unlimited distance
    pub fn new(ray: Ray) -> Self {
        Self {
            ray,
            level: RayQueryLevel::Triangle,
            max_distance: f32::INFINITY,
            drawable_flags: DrawableFlags::GEOMETRY,
            view_mask: u32::MAX,
        }
    }

    pub fn with_level(mut self, level: RayQueryLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_max_distance(mut self, max_distance: f32) -> Self {
        self.max_distance = max_distance;
        self
    }

    pub fn with_flags(mut self, flags: DrawableFlags) -> Self {
        self.drawable_flags = flags;
        self
    }

    pub(crate) fn accepts(&self, drawable: &dyn Drawable) -> bool {
        drawable.drawable_flags().intersects(self.drawable_flags) && drawable.view_mask() & self.view_mask != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayQueryResult {
    pub position: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    pub drawable: DrawableKey,
    /// Sub-object (batch) index, if the drawable reports one
    pub sub_object: Option<u32>,
}

#[cfg(test)]
#[path = "octree_query_tests.rs"]
mod tests;
