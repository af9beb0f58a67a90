/// OcclusionBuffer - low-resolution software depth buffer.
///
/// Depth values are clip-space z/w in 0..1 (larger is farther). Triangles
/// are clipped against the near plane, rasterized two-sided and depth tested
/// per pixel. `build_depth_hierarchy` reduces the buffer into levels that
/// keep the farthest depth of each 2x2 block, so a box is hidden when its
/// nearest point is behind every covered texel of one level.

use glam::{Mat4, Vec3, Vec4};
use crate::camera::Camera;
use crate::math::BoundingBox;

/// Default buffer width; height follows the camera aspect ratio
pub const DEFAULT_OCCLUSION_BUFFER_SIZE: u32 = 256;

const MIN_W: f32 = 1e-4;
/// Depth tolerance applied to visibility tests
const DEPTH_BIAS: f32 = 1e-5;

struct DepthLevel {
    width: u32,
    height: u32,
    depth: Vec<f32>,
}

pub struct OcclusionBuffer {
    width: u32,
    height: u32,
    depth: Vec<f32>,
    hierarchy: Vec<DepthLevel>,
    hierarchy_dirty: bool,
    view_projection: Mat4,
    max_triangles: u32,
    num_triangles: u32,
}

impl OcclusionBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        let mut buffer = Self {
            width: 0,
            height: 0,
            depth: Vec::new(),
            hierarchy: Vec::new(),
            hierarchy_dirty: true,
            view_projection: Mat4::IDENTITY,
            max_triangles: u32::MAX,
            num_triangles: 0,
        };
        buffer.set_size(width, height);
        buffer
    }

    /// Resize the buffer (clamped to at least 1x1) and clear it
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.depth = vec![1.0; (self.width * self.height) as usize];
        self.hierarchy.clear();
        self.hierarchy_dirty = true;
        self.num_triangles = 0;
    }

    /// Use the camera's view-projection for subsequent rasterization and tests
    pub fn set_view(&mut self, camera: &Camera) {
        let mut camera = camera.clone();
        camera.set_aspect_ratio(self.width as f32 / self.height as f32);
        self.view_projection = camera.view_projection();
    }

    pub fn set_view_projection(&mut self, view_projection: Mat4) {
        self.view_projection = view_projection;
    }

    pub fn set_max_triangles(&mut self, max_triangles: u32) {
        self.max_triangles = max_triangles;
    }

    /// Reset depth to the far plane and the triangle count to zero
    pub fn clear(&mut self) {
        self.depth.fill(1.0);
        self.hierarchy_dirty = true;
        self.num_triangles = 0;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn num_triangles(&self) -> u32 {
        self.num_triangles
    }

    pub fn max_triangles(&self) -> u32 {
        self.max_triangles
    }

    pub fn is_full(&self) -> bool {
        self.num_triangles >= self.max_triangles
    }

    /// Depth at a pixel, for diagnostics
    pub fn depth_at(&self, x: u32, y: u32) -> Option<f32> {
        if x < self.width && y < self.height {
            Some(self.depth[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    // ===== RASTERIZATION =====

    /// Rasterize local-space triangles placed with `model`.
    ///
    /// Returns false once the triangle budget is exhausted.
    pub fn add_triangles<I>(&mut self, model: &Mat4, triangles: I) -> bool
    where
        I: IntoIterator<Item = [Vec3; 3]>,
    {
        let transform = self.view_projection * *model;
        for [a, b, c] in triangles {
            if self.is_full() {
                return false;
            }
            self.num_triangles += 1;
            self.hierarchy_dirty = true;

            let clip = [
                transform * a.extend(1.0),
                transform * b.extend(1.0),
                transform * c.extend(1.0),
            ];
            self.draw_clipped(clip);
        }
        !self.is_full()
    }

    fn draw_clipped(&mut self, clip: [Vec4; 3]) {
        let inside = clip.map(|v| v.w >= MIN_W);
        if inside.iter().all(|i| *i) {
            self.rasterize(clip[0], clip[1], clip[2]);
            return;
        }
        if !inside.iter().any(|i| *i) {
            return;
        }

        // Sutherland-Hodgman against w = MIN_W; yields at most a quad
        let mut polygon: [Vec4; 4] = [Vec4::ZERO; 4];
        let mut count = 0;
        for i in 0..3 {
            let current = clip[i];
            let next = clip[(i + 1) % 3];
            if inside[i] {
                polygon[count] = current;
                count += 1;
            }
            if inside[i] != inside[(i + 1) % 3] {
                let t = (MIN_W - current.w) / (next.w - current.w);
                polygon[count] = current + (next - current) * t;
                count += 1;
            }
        }
        for i in 1..count.saturating_sub(1) {
            self.rasterize(polygon[0], polygon[i], polygon[i + 1]);
        }
    }

    fn to_screen(&self, clip: Vec4) -> Vec3 {
        let ndc = clip.truncate() / clip.w;
        Vec3::new(
            (ndc.x * 0.5 + 0.5) * self.width as f32,
            (0.5 - ndc.y * 0.5) * self.height as f32,
            ndc.z,
        )
    }

    fn rasterize(&mut self, a: Vec4, b: Vec4, c: Vec4) {
        let (v0, v1, v2) = (self.to_screen(a), self.to_screen(b), self.to_screen(c));

        let area = edge(v0, v1, v2);
        if area.abs() < f32::EPSILON {
            return;
        }

        let min_x = v0.x.min(v1.x).min(v2.x).floor().max(0.0) as i64;
        let max_x = (v0.x.max(v1.x).max(v2.x).ceil() as i64).min(self.width as i64 - 1);
        let min_y = v0.y.min(v1.y).min(v2.y).floor().max(0.0) as i64;
        let max_y = (v0.y.max(v1.y).max(v2.y).ceil() as i64).min(self.height as i64 - 1);
        if min_x > max_x || min_y > max_y {
            return;
        }

        let inv_area = 1.0 / area;
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let p = Vec3::new(x as f32 + 0.5, y as f32 + 0.5, 0.0);
                let w0 = edge(v1, v2, p) * inv_area;
                let w1 = edge(v2, v0, p) * inv_area;
                let w2 = edge(v0, v1, p) * inv_area;
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }
                let z = (w0 * v0.z + w1 * v1.z + w2 * v2.z).max(0.0);
                let index = (y as u32 * self.width + x as u32) as usize;
                if z < self.depth[index] {
                    self.depth[index] = z;
                }
            }
        }
    }

    // ===== HIERARCHY =====

    /// Build max-depth reduction levels down to 1x1
    pub fn build_depth_hierarchy(&mut self) {
        self.hierarchy.clear();
        let (mut width, mut height) = (self.width, self.height);

        while width > 1 || height > 1 {
            let next_width = width.div_ceil(2);
            let next_height = height.div_ceil(2);
            let source = self.hierarchy.last().map_or(self.depth.as_slice(), |level| level.depth.as_slice());
            let mut depth = Vec::with_capacity((next_width * next_height) as usize);

            for y in 0..next_height {
                for x in 0..next_width {
                    let mut farthest: f32 = 0.0;
                    for (sx, sy) in [(2 * x, 2 * y), (2 * x + 1, 2 * y), (2 * x, 2 * y + 1), (2 * x + 1, 2 * y + 1)] {
                        if sx < width && sy < height {
                            farthest = farthest.max(source[(sy * width + sx) as usize]);
                        }
                    }
                    depth.push(farthest);
                }
            }

            self.hierarchy.push(DepthLevel { width: next_width, height: next_height, depth });
            width = next_width;
            height = next_height;
        }

        self.hierarchy_dirty = false;
    }

    // ===== TESTS =====

    /// Conservative visibility of a world-space box
    pub fn is_visible(&self, bounds: &BoundingBox) -> bool {
        if !bounds.is_defined() {
            return true;
        }

        let mut min_screen = Vec3::splat(f32::INFINITY);
        let mut max_screen = Vec3::splat(f32::NEG_INFINITY);
        for corner in bounds.corners() {
            let clip = self.view_projection * corner.extend(1.0);
            // Box crosses the near plane
            if clip.w < MIN_W {
                return true;
            }
            let screen = self.to_screen(clip);
            min_screen = min_screen.min(screen);
            max_screen = max_screen.max(screen);
        }

        if max_screen.x < 0.0 || max_screen.y < 0.0 || min_screen.x >= self.width as f32 || min_screen.y >= self.height as f32 {
            return true;
        }

        let min_depth = min_screen.z - DEPTH_BIAS;
        let left = min_screen.x.floor().max(0.0) as u32;
        let top = min_screen.y.floor().max(0.0) as u32;
        let right = (max_screen.x.ceil() as u32).min(self.width - 1);
        let bottom = (max_screen.y.ceil() as u32).min(self.height - 1);

        // Pick the level where the rectangle spans only a few texels
        let span = (right - left).max(bottom - top).max(1);
        let wanted = (u32::BITS - span.leading_zeros()).saturating_sub(2) as usize;
        let level = if self.hierarchy_dirty { 0 } else { wanted.min(self.hierarchy.len()) };

        let (width, depth) = if level == 0 {
            (self.width, self.depth.as_slice())
        } else {
            let data = &self.hierarchy[level - 1];
            (data.width, data.depth.as_slice())
        };
        let height = if level == 0 { self.height } else { self.hierarchy[level - 1].height };

        let (left, top) = (left >> level, top >> level);
        let right = (right >> level).min(width - 1);
        let bottom = (bottom >> level).min(height - 1);

        for y in top..=bottom {
            for x in left..=right {
                if min_depth <= depth[(y * width + x) as usize] {
                    return true;
                }
            }
        }
        false
    }
}

/// Twice the signed area of triangle (a, b, p) in screen space
fn edge(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

#[cfg(test)]
#[path = "occlusion_buffer_tests.rs"]
mod tests;
