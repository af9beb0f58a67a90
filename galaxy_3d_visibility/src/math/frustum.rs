/// Frustum: six inward-facing planes plus the eight corner vertices.
///
/// Vertex order: near plane `[0..4]`, far plane `[4..8]`, each as
/// right-top, right-bottom, left-bottom, left-top in view space.
/// A point P is inside when `plane.distance(P) >= 0` for all planes.
///
/// Works for perspective and orthographic projections, and for split
/// frusta built directly from view-space corner positions.

use glam::{Mat4, Vec3, Vec4};
use super::{BoundingBox, Intersection, Sphere};

/// Frustum plane indices
pub const PLANE_NEAR: usize = 0;
pub const PLANE_LEFT: usize = 1;
pub const PLANE_RIGHT: usize = 2;
pub const PLANE_UP: usize = 3;
pub const PLANE_DOWN: usize = 4;
pub const PLANE_FAR: usize = 5;

/// Plane `normal . P + d = 0` with unit normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    /// Build from (A, B, C, D) coefficients, normalizing the normal
    pub fn from_coefficients(plane: Vec4) -> Self {
        let normal = plane.truncate();
        let length = normal.length();
        if length > 0.0 {
            Self { normal: normal / length, d: plane.w / length }
        } else {
            Self { normal, d: plane.w }
        }
    }

    pub fn from_normal_point(normal: Vec3, point: Vec3) -> Self {
        let normal = normal.normalize_or_zero();
        Self { normal, d: -normal.dot(point) }
    }

    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self::from_normal_point((b - a).cross(c - a), a)
    }

    pub fn distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }

    pub fn flipped(&self) -> Self {
        Self { normal: -self.normal, d: -self.d }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Planes: near, left, right, up, down, far
    pub planes: [Plane; 6],
    /// Corner vertices in world space
    pub vertices: [Vec3; 8],
}

impl Frustum {
    /// Extract a frustum from a view-projection matrix (clip depth 0..1).
    ///
    /// Planes use the Gribb & Hartmann row combinations; vertices are the
    /// unprojected clip-space corners.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let m = vp.to_cols_array_2d();
        let row = |r: usize| Vec4::new(m[0][r], m[1][r], m[2][r], m[3][r]);
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let planes = [
            // Near:  row2 (depth 0..1)
            Plane::from_coefficients(r2),
            // Left:  row3 + row0
            Plane::from_coefficients(r3 + r0),
            // Right: row3 - row0
            Plane::from_coefficients(r3 - r0),
            // Up:    row3 - row1
            Plane::from_coefficients(r3 - r1),
            // Down:  row3 + row1
            Plane::from_coefficients(r3 + r1),
            // Far:   row3 - row2
            Plane::from_coefficients(r3 - r2),
        ];

        let inverse = vp.inverse();
        let corner = |x: f32, y: f32, z: f32| inverse.project_point3(Vec3::new(x, y, z));
        let vertices = [
            corner(1.0, 1.0, 0.0),
            corner(1.0, -1.0, 0.0),
            corner(-1.0, -1.0, 0.0),
            corner(-1.0, 1.0, 0.0),
            corner(1.0, 1.0, 1.0),
            corner(1.0, -1.0, 1.0),
            corner(-1.0, -1.0, 1.0),
            corner(-1.0, 1.0, 1.0),
        ];

        Self { planes, vertices }
    }

    /// Build from near/far half extents in view space, transformed to world.
    ///
    /// `near_half` and `far_half` are (half width, half height) at the near
    /// and far distances; the view looks down -Z.
    pub fn from_view_extents(
        near: f32,
        near_half: (f32, f32),
        far: f32,
        far_half: (f32, f32),
        transform: &Mat4,
    ) -> Self {
        let (nx, ny) = near_half;
        let (fx, fy) = far_half;
        let local = [
            Vec3::new(nx, ny, -near),
            Vec3::new(nx, -ny, -near),
            Vec3::new(-nx, -ny, -near),
            Vec3::new(-nx, ny, -near),
            Vec3::new(fx, fy, -far),
            Vec3::new(fx, -fy, -far),
            Vec3::new(-fx, -fy, -far),
            Vec3::new(-fx, fy, -far),
        ];
        Self::from_vertices(local.map(|v| transform.transform_point3(v)))
    }

    /// Perspective frustum (`fov_degrees` is the vertical field of view)
    pub fn from_perspective(
        fov_degrees: f32,
        aspect_ratio: f32,
        zoom: f32,
        near: f32,
        far: f32,
        transform: &Mat4,
    ) -> Self {
        let near = near.max(0.0);
        let far = far.max(near);
        let half_view_size = (fov_degrees.to_radians() * 0.5).tan() / zoom;

        let near_y = near * half_view_size;
        let far_y = far * half_view_size;
        Self::from_view_extents(
            near,
            (near_y * aspect_ratio, near_y),
            far,
            (far_y * aspect_ratio, far_y),
            transform,
        )
    }

    /// Orthographic frustum (`ortho_size` is the full view height)
    pub fn from_orthographic(
        ortho_size: f32,
        aspect_ratio: f32,
        zoom: f32,
        near: f32,
        far: f32,
        transform: &Mat4,
    ) -> Self {
        let near = near.max(0.0);
        let far = far.max(near);
        let half_y = ortho_size * 0.5 / zoom;
        let half = (half_y * aspect_ratio, half_y);
        Self::from_view_extents(near, half, far, half, transform)
    }

    /// Rebuild planes from eight world-space vertices.
    ///
    /// Each plane is oriented towards the vertex centroid, so mirrored
    /// transforms still produce inward-facing planes.
    pub fn from_vertices(vertices: [Vec3; 8]) -> Self {
        let v = &vertices;
        let mut planes = [
            Plane::from_points(v[2], v[1], v[0]),
            Plane::from_points(v[3], v[7], v[6]),
            Plane::from_points(v[1], v[5], v[4]),
            Plane::from_points(v[0], v[4], v[7]),
            Plane::from_points(v[6], v[5], v[1]),
            Plane::from_points(v[5], v[6], v[7]),
        ];

        let centroid = vertices.iter().copied().sum::<Vec3>() / 8.0;
        for plane in &mut planes {
            if plane.distance(centroid) < 0.0 {
                *plane = plane.flipped();
            }
        }

        Self { planes, vertices }
    }

    /// Frustum transformed by an affine matrix
    pub fn transformed(&self, transform: &Mat4) -> Self {
        Self::from_vertices(self.vertices.map(|v| transform.transform_point3(v)))
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.vertices)
    }

    pub fn is_inside_point(&self, point: Vec3) -> Intersection {
        if self.planes.iter().any(|plane| plane.distance(point) < 0.0) {
            Intersection::Outside
        } else {
            Intersection::Inside
        }
    }

    pub fn is_inside_sphere(&self, sphere: &Sphere) -> Intersection {
        let mut all_inside = true;
        for plane in &self.planes {
            let distance = plane.distance(sphere.center);
            if distance < -sphere.radius {
                return Intersection::Outside;
            }
            if distance < sphere.radius {
                all_inside = false;
            }
        }
        if all_inside { Intersection::Inside } else { Intersection::Intersects }
    }

    /// Classify a box (3-way test).
    ///
    /// Tests the positive vertex (corner furthest along the plane normal)
    /// and the negative vertex against each plane:
    /// - p-vertex outside any plane → `Outside`
    /// - n-vertex outside some plane → `Intersects`
    /// - otherwise → `Inside`
    pub fn is_inside_box(&self, bounds: &BoundingBox) -> Intersection {
        let mut all_inside = true;

        for plane in &self.planes {
            let normal = plane.normal;
            let p_vertex = Vec3::new(
                if normal.x >= 0.0 { bounds.max.x } else { bounds.min.x },
                if normal.y >= 0.0 { bounds.max.y } else { bounds.min.y },
                if normal.z >= 0.0 { bounds.max.z } else { bounds.min.z },
            );
            if plane.distance(p_vertex) < 0.0 {
                return Intersection::Outside;
            }

            let n_vertex = Vec3::new(
                if normal.x >= 0.0 { bounds.min.x } else { bounds.max.x },
                if normal.y >= 0.0 { bounds.min.y } else { bounds.max.y },
                if normal.z >= 0.0 { bounds.min.z } else { bounds.max.z },
            );
            if plane.distance(n_vertex) < 0.0 {
                all_inside = false;
            }
        }

        if all_inside { Intersection::Inside } else { Intersection::Intersects }
    }

    /// Like `is_inside_box` but never reports `Intersects`
    pub fn is_inside_box_fast(&self, bounds: &BoundingBox) -> Intersection {
        for plane in &self.planes {
            let normal = plane.normal;
            let p_vertex = Vec3::new(
                if normal.x >= 0.0 { bounds.max.x } else { bounds.min.x },
                if normal.y >= 0.0 { bounds.max.y } else { bounds.min.y },
                if normal.z >= 0.0 { bounds.max.z } else { bounds.min.z },
            );
            if plane.distance(p_vertex) < 0.0 {
                return Intersection::Outside;
            }
        }
        Intersection::Inside
    }
}

#[cfg(test)]
#[path = "frustum_tests.rs"]
mod tests;
