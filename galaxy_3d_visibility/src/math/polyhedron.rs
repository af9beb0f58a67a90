/// Convex polyhedron stored as a list of planar faces.
///
/// Used to clip a camera split frustum against the bounds of lit geometry
/// before fitting a directional light shadow camera around it.

use glam::{Mat4, Vec3};
use super::{BoundingBox, Frustum, Plane};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polyhedron {
    pub faces: Vec<Vec<Vec3>>,
}

impl Polyhedron {
    pub fn from_frustum(frustum: &Frustum) -> Self {
        let v = &frustum.vertices;
        Self {
            faces: vec![
                vec![v[0], v[4], v[5], v[1]],
                vec![v[7], v[3], v[2], v[6]],
                vec![v[7], v[4], v[0], v[3]],
                vec![v[1], v[5], v[6], v[2]],
                vec![v[4], v[7], v[6], v[5]],
                vec![v[3], v[0], v[1], v[2]],
            ],
        }
    }

    pub fn from_box(bounds: &BoundingBox) -> Self {
        let c = bounds.corners();
        Self {
            faces: vec![
                vec![c[0], c[2], c[3], c[1]],
                vec![c[4], c[5], c[7], c[6]],
                vec![c[0], c[1], c[5], c[4]],
                vec![c[2], c[6], c[7], c[3]],
                vec![c[0], c[4], c[6], c[2]],
                vec![c[1], c[3], c[7], c[5]],
            ],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Keep the part on the positive side of `plane`, capping the cut
    pub fn clip_plane(&mut self, plane: &Plane) {
        let mut cut_points: Vec<Vec3> = Vec::new();
        let mut clipped_faces = Vec::with_capacity(self.faces.len() + 1);

        for face in &self.faces {
            let mut out_face = Vec::with_capacity(face.len() + 1);
            for (i, &current) in face.iter().enumerate() {
                let previous = face[(i + face.len() - 1) % face.len()];
                let current_distance = plane.distance(current);
                let previous_distance = plane.distance(previous);

                if (current_distance >= 0.0) != (previous_distance >= 0.0) {
                    let t = previous_distance / (previous_distance - current_distance);
                    let cut = previous + (current - previous) * t;
                    out_face.push(cut);
                    cut_points.push(cut);
                }
                if current_distance >= 0.0 {
                    out_face.push(current);
                }
            }
            if out_face.len() >= 3 {
                clipped_faces.push(out_face);
            }
        }

        if let Some(cap) = Self::build_cap(plane, cut_points) {
            clipped_faces.push(cap);
        }
        self.faces = clipped_faces;
    }

    /// Clip against the six faces of an axis-aligned box
    pub fn clip_box(&mut self, bounds: &BoundingBox) {
        let planes = [
            Plane::from_normal_point(Vec3::X, bounds.min),
            Plane::from_normal_point(Vec3::NEG_X, bounds.max),
            Plane::from_normal_point(Vec3::Y, bounds.min),
            Plane::from_normal_point(Vec3::NEG_Y, bounds.max),
            Plane::from_normal_point(Vec3::Z, bounds.min),
            Plane::from_normal_point(Vec3::NEG_Z, bounds.max),
        ];
        for plane in &planes {
            if self.is_empty() {
                break;
            }
            self.clip_plane(plane);
        }
    }

    pub fn transformed(&self, transform: &Mat4) -> Self {
        Self {
            faces: self
                .faces
                .iter()
                .map(|face| face.iter().map(|v| transform.transform_point3(*v)).collect())
                .collect(),
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bounds = BoundingBox::UNDEFINED;
        for vertex in self.faces.iter().flatten() {
            bounds.merge_point(*vertex);
        }
        bounds
    }

    /// Order the cut points around their centroid to form the cap polygon
    fn build_cap(plane: &Plane, mut points: Vec<Vec3>) -> Option<Vec<Vec3>> {
        points.dedup_by(|a, b| a.distance_squared(*b) < 1e-10);
        let mut unique: Vec<Vec3> = Vec::with_capacity(points.len());
        for point in points {
            if !unique.iter().any(|u| u.distance_squared(point) < 1e-10) {
                unique.push(point);
            }
        }
        if unique.len() < 3 {
            return None;
        }

        let centroid = unique.iter().copied().sum::<Vec3>() / unique.len() as f32;
        let axis_u = (unique[0] - centroid).normalize_or_zero();
        let axis_v = plane.normal.cross(axis_u);
        unique.sort_by(|a, b| {
            let angle_a = (*a - centroid).dot(axis_v).atan2((*a - centroid).dot(axis_u));
            let angle_b = (*b - centroid).dot(axis_v).atan2((*b - centroid).dot(axis_u));
            angle_a.total_cmp(&angle_b)
        });
        Some(unique)
    }
}

#[cfg(test)]
#[path = "polyhedron_tests.rs"]
mod tests;
