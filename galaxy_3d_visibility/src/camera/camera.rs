/// Camera - world placement plus projection parameters.
///
/// Used both for the main view and for the shadow cameras the view builds
/// per light. Cameras look down their local -Z axis; the projection maps
/// depth to 0..1.

use glam::{Mat4, Quat, Vec3};
use crate::math::{look_rotation, Frustum};

/// Smallest near clip distance accepted for perspective cameras
pub const MIN_NEAR_CLIP: f32 = 0.01;
/// Largest accepted field of view in degrees
pub const MAX_FOV: f32 = 160.0;

const DEFAULT_NEAR_CLIP: f32 = 0.1;
const DEFAULT_FAR_CLIP: f32 = 1000.0;
const DEFAULT_FOV: f32 = 45.0;
const DEFAULT_ORTHO_SIZE: f32 = 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    rotation: Quat,
    near_clip: f32,
    far_clip: f32,
    fov: f32,
    ortho_size: f32,
    aspect_ratio: f32,
    zoom: f32,
    lod_bias: f32,
    orthographic: bool,
    auto_aspect_ratio: bool,
    view_mask: u32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            near_clip: DEFAULT_NEAR_CLIP,
            far_clip: DEFAULT_FAR_CLIP,
            fov: DEFAULT_FOV,
            ortho_size: DEFAULT_ORTHO_SIZE,
            aspect_ratio: 1.0,
            zoom: 1.0,
            lod_bias: 1.0,
            orthographic: false,
            auto_aspect_ratio: true,
            view_mask: u32::MAX,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Perspective camera placed at `position` looking at `target`
    pub fn looking_at(position: Vec3, target: Vec3, fov: f32, near: f32, far: f32) -> Self {
        let mut camera = Self::default();
        camera.set_position(position);
        camera.look_at(target, Vec3::Y);
        camera.set_fov(fov);
        camera.set_near_clip(near);
        camera.set_far_clip(far);
        camera
    }

    // ===== PLACEMENT =====

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation.normalize();
    }

    /// Point the camera at `target`
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.set_direction_with_up(target - self.position, up);
    }

    /// Point the camera along a world direction
    pub fn set_direction(&mut self, direction: Vec3) {
        self.set_direction_with_up(direction, Vec3::Y);
    }

    fn set_direction_with_up(&mut self, direction: Vec3, up: Vec3) {
        self.rotation = look_rotation(direction, up);
    }

    /// World-space forward vector (local -Z)
    pub fn direction(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Camera world transform
    pub fn transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    // ===== PROJECTION PARAMETERS =====

    /// Near clip distance; always zero for orthographic cameras
    pub fn near_clip(&self) -> f32 {
        if self.orthographic { 0.0 } else { self.near_clip }
    }

    pub fn set_near_clip(&mut self, near_clip: f32) {
        self.near_clip = near_clip.max(MIN_NEAR_CLIP);
    }

    pub fn far_clip(&self) -> f32 {
        self.far_clip
    }

    pub fn set_far_clip(&mut self, far_clip: f32) {
        self.far_clip = far_clip.max(MIN_NEAR_CLIP);
    }

    /// Vertical field of view in degrees
    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov.clamp(0.0, MAX_FOV);
    }

    /// Full view height for orthographic projection
    pub fn ortho_size(&self) -> f32 {
        self.ortho_size
    }

    pub fn set_ortho_size(&mut self, ortho_size: f32) {
        self.ortho_size = ortho_size.max(f32::EPSILON);
    }

    /// Set orthographic width and height at once (also sets the aspect ratio)
    pub fn set_ortho_extent(&mut self, width: f32, height: f32) {
        self.set_ortho_size(height);
        self.set_aspect_ratio(width / height.max(f32::EPSILON));
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio.max(f32::EPSILON);
    }

    /// Whether the view recomputes the aspect ratio from its viewport
    pub fn auto_aspect_ratio(&self) -> bool {
        self.auto_aspect_ratio
    }

    pub fn set_auto_aspect_ratio(&mut self, enable: bool) {
        self.auto_aspect_ratio = enable;
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.max(f32::EPSILON);
    }

    pub fn lod_bias(&self) -> f32 {
        self.lod_bias
    }

    pub fn set_lod_bias(&mut self, bias: f32) {
        self.lod_bias = bias.max(f32::EPSILON);
    }

    pub fn is_orthographic(&self) -> bool {
        self.orthographic
    }

    pub fn set_orthographic(&mut self, enable: bool) {
        self.orthographic = enable;
    }

    /// Bitmask compared against drawable view masks
    pub fn view_mask(&self) -> u32 {
        self.view_mask
    }

    pub fn set_view_mask(&mut self, mask: u32) {
        self.view_mask = mask;
    }

    // ===== DERIVED =====

    /// Half of the view height at unit distance (perspective) or in world units (orthographic)
    pub fn half_view_size(&self) -> f32 {
        if self.orthographic {
            self.ortho_size * 0.5 / self.zoom
        } else {
            (self.fov.to_radians() * 0.5).tan() / self.zoom
        }
    }

    /// View matrix (inverse of the camera world transform)
    pub fn view(&self) -> Mat4 {
        self.transform().inverse()
    }

    /// Projection matrix (right-handed, depth 0..1)
    pub fn projection(&self) -> Mat4 {
        if self.orthographic {
            let half_height = self.half_view_size();
            let half_width = half_height * self.aspect_ratio;
            Mat4::orthographic_rh(
                -half_width,
                half_width,
                -half_height,
                half_height,
                self.near_clip(),
                self.far_clip,
            )
        } else {
            let fov_y = 2.0 * self.half_view_size().atan();
            Mat4::perspective_rh(fov_y, self.aspect_ratio, self.near_clip, self.far_clip)
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// World-space frustum
    pub fn frustum(&self) -> Frustum {
        self.split_frustum(self.near_clip(), self.far_clip)
    }

    /// World-space frustum limited to the `near..far` depth range
    pub fn split_frustum(&self, near: f32, far: f32) -> Frustum {
        self.build_frustum(near, far, &self.transform())
    }

    /// View-space frustum limited to the `near..far` depth range
    pub fn view_space_split_frustum(&self, near: f32, far: f32) -> Frustum {
        self.build_frustum(near, far, &Mat4::IDENTITY)
    }

    fn build_frustum(&self, near: f32, far: f32, transform: &Mat4) -> Frustum {
        let near = near.max(self.near_clip());
        let far = far.min(self.far_clip).max(near);
        if self.orthographic {
            Frustum::from_orthographic(self.ortho_size, self.aspect_ratio, self.zoom, near, far, transform)
        } else {
            Frustum::from_perspective(self.fov, self.aspect_ratio, self.zoom, near, far, transform)
        }
    }

    /// Distance metric for sorting: Euclidean for perspective, view depth for orthographic
    pub fn distance(&self, world_position: Vec3) -> f32 {
        if self.orthographic {
            self.view().transform_point3(world_position).z.abs()
        } else {
            (world_position - self.position).length()
        }
    }

    /// View-space depth of a world position (positive in front of the camera)
    pub fn depth(&self, world_position: Vec3) -> f32 {
        -self.view().transform_point3(world_position).z
    }

    /// Distance used for LOD and technique selection
    pub fn lod_distance(&self, distance: f32, scale: f32, bias: f32) -> f32 {
        let divisor = (self.lod_bias * bias * scale).max(f32::EPSILON);
        if self.orthographic {
            self.ortho_size / divisor
        } else {
            distance / divisor
        }
    }
}

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;
