//! Resource-level geometry types.
//!
//! The visibility core never touches GPU buffers: a draw call refers to its
//! vertex data through an opaque `GeometryId`. CPU-side positions and
//! indices are only kept where the core needs triangles, for picking and
//! for occlusion rasterization.

use glam::{Mat4, Vec3};
use crate::error::Result;
use crate::engine_bail;
use crate::math::{BoundingBox, Ray};

/// Opaque handle of GPU geometry owned by the submission layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GeometryId(pub u32);

/// Geometry creation descriptor
#[derive(Debug, Clone, Default)]
pub struct GeometryDesc {
    pub id: GeometryId,
    pub positions: Vec<Vec3>,
    /// Triangle list; empty for non-indexed geometry
    pub indices: Vec<u32>,
    /// Smallest LOD distance this geometry is used at
    pub lod_distance: f32,
}

/// Triangle data of one drawable part
#[derive(Debug, Clone)]
pub struct Geometry {
    id: GeometryId,
    positions: Vec<Vec3>,
    indices: Vec<u32>,
    lod_distance: f32,
    bounding_box: BoundingBox,
}

impl Geometry {
    pub fn from_desc(desc: GeometryDesc) -> Result<Self> {
        let triangle_count = if desc.indices.is_empty() { desc.positions.len() } else { desc.indices.len() };
        if triangle_count % 3 != 0 {
            engine_bail!(InvalidResource @ "galaxy3d::Geometry",
                "Geometry {:?}: {} vertices/indices is not a triangle list", desc.id, triangle_count);
        }
        if let Some(index) = desc.indices.iter().find(|index| **index as usize >= desc.positions.len()) {
            engine_bail!(InvalidResource @ "galaxy3d::Geometry",
                "Geometry {:?}: index {} out of range ({} vertices)", desc.id, index, desc.positions.len());
        }

        Ok(Self {
            id: desc.id,
            bounding_box: BoundingBox::from_points(&desc.positions),
            positions: desc.positions,
            indices: desc.indices,
            lod_distance: desc.lod_distance.max(0.0),
        })
    }

    pub fn id(&self) -> GeometryId {
        self.id
    }

    pub fn lod_distance(&self) -> f32 {
        self.lod_distance
    }

    pub fn is_indexed(&self) -> bool {
        !self.indices.is_empty()
    }

    /// Local-space bounds
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    pub fn num_triangles(&self) -> usize {
        if self.is_indexed() { self.indices.len() / 3 } else { self.positions.len() / 3 }
    }

    /// Local-space triangles
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        (0..self.num_triangles()).map(move |triangle| {
            let corner = |i: usize| {
                let vertex = triangle * 3 + i;
                if self.is_indexed() { self.positions[self.indices[vertex] as usize] } else { self.positions[vertex] }
            };
            [corner(0), corner(1), corner(2)]
        })
    }

    /// Closest triangle hit of a world-space ray against this geometry
    /// placed with `transform`. Returns distance and world normal.
    pub fn hit_distance(&self, ray: &Ray, transform: &Mat4) -> Option<(f32, Vec3)> {
        let inverse = transform.inverse();
        let local_ray = Ray::new(
            inverse.transform_point3(ray.origin),
            inverse.transform_vector3(ray.direction),
        );

        let mut closest: Option<(f32, Vec3, Vec3)> = None;
        for [v0, v1, v2] in self.triangles() {
            if let Some((distance, normal)) = local_ray.hit_distance_triangle(v0, v1, v2) {
                if closest.map_or(true, |(best, _, _)| distance < best) {
                    closest = Some((distance, normal, local_ray.point_at(distance)));
                }
            }
        }

        // Distances are measured again in world space since the transform may scale
        closest.map(|(_, normal, local_point)| {
            let world_point = transform.transform_point3(local_point);
            let world_normal = inverse.transpose().transform_vector3(normal).normalize_or_zero();
            ((world_point - ray.origin).length(), world_normal)
        })
    }
}

#[cfg(test)]
#[path = "geometry_tests.rs"]
mod tests;
