/// Light - a drawable that illuminates geometry and may cast shadows.
///
/// Directional lights are unbounded, spot lights cover their cone frustum
/// and point lights a sphere of `range`. Shadow tuning lives in the cascade,
/// focus and bias parameter blocks.

use glam::{Mat4, Quat, Vec3, Vec4};
use crate::math::{look_rotation, BoundingBox, Frustum, Ray, LARGE_VALUE};
use super::drawable::{Drawable, DrawableFlags};

/// Maximum shadow cameras per light (point light cube faces)
pub const MAX_LIGHT_SPLITS: usize = 6;
/// Maximum directional light cascades
pub const MAX_CASCADE_SPLITS: usize = 4;
/// Smallest accepted shadow quantization step
pub const SHADOW_MIN_QUANTIZE: f32 = 0.1;
/// Smallest accepted shadow camera view size
pub const SHADOW_MIN_VIEW: f32 = 1.0;
/// Near clip used for spot and point light frusta
pub const LIGHT_MIN_NEAR_CLIP: f32 = 0.01;
/// Per-vertex lights kept on one drawable
pub const MAX_VERTEX_LIGHTS: usize = 4;

const DEFAULT_RANGE: f32 = 10.0;
const DEFAULT_LIGHT_FOV: f32 = 30.0;
const DEFAULT_SHADOW_SPLIT: f32 = 1000.0;
const DEFAULT_SHADOW_FADE_START: f32 = 0.8;
const DEFAULT_SHADOW_QUANTIZE: f32 = 0.5;
const DEFAULT_SHADOW_MIN_VIEW: f32 = 3.0;
const DEFAULT_CONSTANT_BIAS: f32 = 0.0002;
const DEFAULT_SLOPE_SCALED_BIAS: f32 = 0.5;
const DEFAULT_SHADOW_NEAR_FAR_RATIO: f32 = 0.002;
const DEFAULT_SHADOW_MAX_EXTRUSION: f32 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightType {
    Directional,
    Spot,
    Point,
}

// ===== SHADOW PARAMETERS =====

/// Depth bias applied when rendering and sampling shadow maps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasParameters {
    pub constant_bias: f32,
    pub slope_scaled_bias: f32,
    pub normal_offset: f32,
}

impl Default for BiasParameters {
    fn default() -> Self {
        Self {
            constant_bias: DEFAULT_CONSTANT_BIAS,
            slope_scaled_bias: DEFAULT_SLOPE_SCALED_BIAS,
            normal_offset: 0.0,
        }
    }
}

impl BiasParameters {
    pub fn validate(mut self) -> Self {
        self.constant_bias = self.constant_bias.clamp(-1.0, 1.0);
        self.slope_scaled_bias = self.slope_scaled_bias.clamp(-16.0, 16.0);
        self.normal_offset = self.normal_offset.max(0.0);
        self
    }
}

/// Directional light cascade far distances and fading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeParameters {
    /// Far distance of each cascade; zero ends the cascade list
    pub splits: Vec4,
    /// Fraction of the shadow range where fading starts
    pub fade_start: f32,
    /// Bias multiplier growth per cascade
    pub bias_auto_adjust: f32,
}

impl Default for CascadeParameters {
    fn default() -> Self {
        Self {
            splits: Vec4::new(DEFAULT_SHADOW_SPLIT, 0.0, 0.0, 0.0),
            fade_start: DEFAULT_SHADOW_FADE_START,
            bias_auto_adjust: 1.0,
        }
    }
}

impl CascadeParameters {
    pub fn new(splits: [f32; MAX_CASCADE_SPLITS], fade_start: f32) -> Self {
        Self { splits: Vec4::from_array(splits), fade_start, bias_auto_adjust: 1.0 }
    }

    pub fn validate(mut self) -> Self {
        self.splits = self.splits.max(Vec4::ZERO);
        self.fade_start = self.fade_start.clamp(f32::EPSILON, 1.0);
        self.bias_auto_adjust = self.bias_auto_adjust.max(0.0);
        self
    }

    /// Far distance of the last cascade
    pub fn shadow_range(&self) -> f32 {
        self.splits.max_element()
    }
}

/// Shadow camera focusing and quantization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusParameters {
    /// Fit the shadow camera to the visible casters and receivers
    pub focus: bool,
    /// Allow different width and height scales while focusing
    pub non_uniform: bool,
    /// Shrink spot and point light shadow cameras to the visible area
    pub auto_size: bool,
    /// View size snapping step
    pub quantize: f32,
    /// Smallest view size
    pub min_view: f32,
}

impl Default for FocusParameters {
    fn default() -> Self {
        Self {
            focus: true,
            non_uniform: true,
            auto_size: true,
            quantize: DEFAULT_SHADOW_QUANTIZE,
            min_view: DEFAULT_SHADOW_MIN_VIEW,
        }
    }
}

impl FocusParameters {
    pub fn validate(mut self) -> Self {
        self.quantize = self.quantize.max(SHADOW_MIN_QUANTIZE);
        self.min_view = self.min_view.max(SHADOW_MIN_VIEW);
        self
    }
}

// ===== LIGHT =====

#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    light_type: LightType,
    position: Vec3,
    rotation: Quat,
    color: Vec3,
    brightness: f32,
    specular_intensity: f32,
    range: f32,
    fov: f32,
    aspect_ratio: f32,
    per_vertex: bool,
    cast_shadows: bool,
    draw_distance: f32,
    shadow_distance: f32,
    fade_distance: f32,
    shadow_fade_distance: f32,
    shadow_intensity: f32,
    shadow_resolution: f32,
    shadow_near_far_ratio: f32,
    shadow_max_extrusion: f32,
    shadow_bias: BiasParameters,
    shadow_cascade: CascadeParameters,
    shadow_focus: FocusParameters,
    view_mask: u32,
    light_mask: u32,
}

impl Light {
    pub fn new(light_type: LightType) -> Self {
        Self {
            light_type,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            color: Vec3::ONE,
            brightness: 1.0,
            specular_intensity: 1.0,
            range: DEFAULT_RANGE,
            fov: DEFAULT_LIGHT_FOV,
            aspect_ratio: 1.0,
            per_vertex: false,
            cast_shadows: false,
            draw_distance: 0.0,
            shadow_distance: 0.0,
            fade_distance: 0.0,
            shadow_fade_distance: 0.0,
            shadow_intensity: 0.0,
            shadow_resolution: 1.0,
            shadow_near_far_ratio: DEFAULT_SHADOW_NEAR_FAR_RATIO,
            shadow_max_extrusion: DEFAULT_SHADOW_MAX_EXTRUSION,
            shadow_bias: BiasParameters::default(),
            shadow_cascade: CascadeParameters::default(),
            shadow_focus: FocusParameters::default(),
            view_mask: u32::MAX,
            light_mask: u32::MAX,
        }
    }

    /// Directional light shining along `direction`
    pub fn directional(direction: Vec3) -> Self {
        let mut light = Self::new(LightType::Directional);
        light.set_direction(direction);
        light
    }

    pub fn point(position: Vec3, range: f32) -> Self {
        let mut light = Self::new(LightType::Point);
        light.set_position(position);
        light.set_range(range);
        light
    }

    pub fn spot(position: Vec3, direction: Vec3, range: f32, fov: f32) -> Self {
        let mut light = Self::new(LightType::Spot);
        light.set_position(position);
        light.set_direction(direction);
        light.set_range(range);
        light.set_fov(fov);
        light
    }

    // ===== PLACEMENT =====

    pub fn light_type(&self) -> LightType {
        self.light_type
    }

    pub fn set_light_type(&mut self, light_type: LightType) {
        self.light_type = light_type;
    }

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

    /// World direction the light shines along (local -Z)
    pub fn direction(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn set_direction(&mut self, direction: Vec3) {
        self.rotation = look_rotation(direction, Vec3::Y);
    }

    pub fn transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.position)
    }

    // ===== APPEARANCE =====

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }

    pub fn brightness(&self) -> f32 {
        self.brightness
    }

    /// Negative brightness makes a darkening light
    pub fn set_brightness(&mut self, brightness: f32) {
        self.brightness = brightness;
    }

    pub fn specular_intensity(&self) -> f32 {
        self.specular_intensity
    }

    pub fn set_specular_intensity(&mut self, intensity: f32) {
        self.specular_intensity = intensity.max(0.0);
    }

    /// Color multiplied by brightness
    pub fn effective_color(&self) -> Vec3 {
        self.color * self.brightness
    }

    pub fn is_negative(&self) -> bool {
        self.effective_color().element_sum() < 0.0
    }

    pub fn range(&self) -> f32 {
        self.range
    }

    pub fn set_range(&mut self, range: f32) {
        self.range = range.max(0.0);
    }

    /// Spot cone field of view in degrees
    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov.clamp(0.0, crate::camera::MAX_FOV);
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio.max(f32::EPSILON);
    }

    pub fn per_vertex(&self) -> bool {
        self.per_vertex
    }

    pub fn set_per_vertex(&mut self, enable: bool) {
        self.per_vertex = enable;
    }

    pub fn fade_distance(&self) -> f32 {
        self.fade_distance
    }

    pub fn set_fade_distance(&mut self, distance: f32) {
        self.fade_distance = distance.max(0.0);
    }

    pub fn set_draw_distance(&mut self, distance: f32) {
        self.draw_distance = distance.max(0.0);
    }

    pub fn set_view_mask(&mut self, mask: u32) {
        self.view_mask = mask;
    }

    /// Compared against the light masks of lit drawables
    pub fn set_light_mask(&mut self, mask: u32) {
        self.light_mask = mask;
    }

    // ===== SHADOWS =====

    pub fn set_cast_shadows(&mut self, enable: bool) {
        self.cast_shadows = enable;
    }

    pub fn set_shadow_distance(&mut self, distance: f32) {
        self.shadow_distance = distance.max(0.0);
    }

    pub fn shadow_fade_distance(&self) -> f32 {
        self.shadow_fade_distance
    }

    pub fn set_shadow_fade_distance(&mut self, distance: f32) {
        self.shadow_fade_distance = distance.max(0.0);
    }

    /// 0 = fully dark shadows, 1 = no shadowing
    pub fn shadow_intensity(&self) -> f32 {
        self.shadow_intensity
    }

    pub fn set_shadow_intensity(&mut self, intensity: f32) {
        self.shadow_intensity = intensity.clamp(0.0, 1.0);
    }

    /// Fraction of the full shadow map size to request
    pub fn shadow_resolution(&self) -> f32 {
        self.shadow_resolution
    }

    pub fn set_shadow_resolution(&mut self, resolution: f32) {
        self.shadow_resolution = resolution.clamp(0.125, 1.0);
    }

    /// Spot and point light shadow camera near clip as a fraction of range
    pub fn shadow_near_far_ratio(&self) -> f32 {
        self.shadow_near_far_ratio
    }

    pub fn set_shadow_near_far_ratio(&mut self, ratio: f32) {
        self.shadow_near_far_ratio = ratio.clamp(0.0, 0.5);
    }

    /// Distance directional light shadow cameras are pulled back towards the light
    pub fn shadow_max_extrusion(&self) -> f32 {
        self.shadow_max_extrusion
    }

    pub fn set_shadow_max_extrusion(&mut self, extrusion: f32) {
        self.shadow_max_extrusion = extrusion.max(1.0);
    }

    pub fn shadow_bias(&self) -> &BiasParameters {
        &self.shadow_bias
    }

    pub fn set_shadow_bias(&mut self, parameters: BiasParameters) {
        self.shadow_bias = parameters.validate();
    }

    pub fn shadow_cascade(&self) -> &CascadeParameters {
        &self.shadow_cascade
    }

    pub fn set_shadow_cascade(&mut self, parameters: CascadeParameters) {
        self.shadow_cascade = parameters.validate();
    }

    pub fn shadow_focus(&self) -> &FocusParameters {
        &self.shadow_focus
    }

    pub fn set_shadow_focus(&mut self, parameters: FocusParameters) {
        self.shadow_focus = parameters.validate();
    }

    // ===== DERIVED =====

    /// Spot light cone as a world-space frustum
    pub fn frustum(&self) -> Frustum {
        Frustum::from_perspective(
            self.fov,
            self.aspect_ratio,
            1.0,
            LIGHT_MIN_NEAR_CLIP,
            self.range,
            &self.transform(),
        )
    }

    /// Brightness weight used when ranking lights
    pub fn intensity_divisor(&self, attenuation: f32) -> f32 {
        self.effective_color().element_sum().max(0.0) * attenuation + f32::EPSILON
    }

    /// Sort value relative to a camera distance; lower sorts first
    pub fn intensity_sort_value(&self, distance: f32) -> f32 {
        match self.light_type {
            LightType::Directional => 1.0 / self.intensity_divisor(1.0),
            _ => distance.max(crate::camera::MIN_NEAR_CLIP) / self.intensity_divisor(1.0),
        }
    }

    /// Sort value relative to a lit object's bounds; lower sorts first
    pub fn intensity_sort_value_for_box(&self, bounds: &BoundingBox) -> f32 {
        match self.light_type {
            LightType::Directional => 1.0 / self.intensity_divisor(1.0),
            LightType::Spot => {
                let center = bounds.center();
                let light_ray = Ray::new(self.position, self.direction());
                let center_projection = light_ray.project(center);
                let center_distance = (center_projection - self.position).length();
                let center_ray = Ray::new(center_projection, center - center_projection);
                let center_angle = center_ray.hit_distance_box(bounds) / center_distance.max(f32::EPSILON);
                let spot_angle = (self.fov.to_radians() * 0.5).tan();
                let spot_factor = (center_angle / spot_angle.max(f32::EPSILON)).min(1.0);
                let normalized = center_distance / self.range.max(f32::EPSILON);
                let attenuation = (1.0 - normalized * normalized).max(f32::EPSILON);
                (1.0 + spot_factor) / self.intensity_divisor(attenuation)
            }
            LightType::Point => {
                let normalized = bounds.distance_to_point(self.position) / self.range.max(f32::EPSILON);
                let attenuation = (1.0 - normalized * normalized).max(f32::EPSILON);
                1.0 / self.intensity_divisor(attenuation)
            }
        }
    }

    /// Number of shadow cameras the light needs
    pub fn num_shadow_splits(&self) -> usize {
        match self.light_type {
            LightType::Directional => {
                let splits = self.shadow_cascade.splits.to_array();
                let mut count = 0;
                let mut near = 0.0;
                for far in splits {
                    if far <= near {
                        break;
                    }
                    near = far;
                    count += 1;
                }
                count.max(1)
            }
            LightType::Spot => 1,
            LightType::Point => MAX_LIGHT_SPLITS,
        }
    }
}

impl Drawable for Light {
    fn world_bounding_box(&self) -> BoundingBox {
        match self.light_type {
            LightType::Directional => BoundingBox::from_extent(LARGE_VALUE),
            LightType::Spot => self.frustum().bounding_box(),
            LightType::Point => BoundingBox::from_center_half_size(self.position, Vec3::splat(self.range)),
        }
    }

    fn drawable_flags(&self) -> DrawableFlags {
        DrawableFlags::LIGHT
    }

    fn view_mask(&self) -> u32 {
        self.view_mask
    }

    fn light_mask(&self) -> u32 {
        self.light_mask
    }

    fn is_occludee(&self) -> bool {
        self.light_type != LightType::Directional
    }

    fn cast_shadows(&self) -> bool {
        self.cast_shadows
    }

    fn draw_distance(&self) -> f32 {
        self.draw_distance
    }

    fn shadow_distance(&self) -> f32 {
        self.shadow_distance
    }

    fn as_light(&self) -> Option<&Light> {
        Some(self)
    }
}

#[cfg(test)]
#[path = "light_tests.rs"]
mod tests;
