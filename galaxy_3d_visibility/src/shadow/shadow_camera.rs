/// Shadow cameras - one per shadow split of a light.
///
/// Directional lights get an orthographic camera per cascade, fitted around
/// the part of the view frustum the cascade covers (optionally clipped to
/// the lit geometry) and snapped to shadow map texels. Spot lights use their
/// cone; point lights six 90 degree cube faces.

use glam::{Vec2, Vec3};
use smallvec::SmallVec;
use crate::camera::Camera;
use crate::math::{BoundingBox, Frustum, IntRect, Intersection, Polyhedron, Rect, Sphere, EPSILON};
use crate::scene::{FocusParameters, Light, LightType, MAX_LIGHT_SPLITS};

/// Cube face directions, in split order
const POINT_LIGHT_FACES: [Vec3; MAX_LIGHT_SPLITS] = [
    Vec3::X,
    Vec3::NEG_X,
    Vec3::Y,
    Vec3::NEG_Y,
    Vec3::Z,
    Vec3::NEG_Z,
];

/// A shadow camera and the view depth range it shadows
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowCameraSplit {
    pub camera: Camera,
    pub near_split: f32,
    pub far_split: f32,
}

/// Build the shadow cameras of `light` for the view seen by `cull_camera`.
///
/// `scene_depth` is the min/max view depth of the visible geometry and
/// `lit_bounds(near, far)` returns the merged world bounds of the lit
/// geometry whose depth range overlaps `near..far`; both are only used to
/// focus directional cascades.
pub fn setup_shadow_cameras<F>(
    light: &Light,
    cull_camera: &Camera,
    scene_depth: (f32, f32),
    mut lit_bounds: F,
) -> SmallVec<[ShadowCameraSplit; MAX_LIGHT_SPLITS]>
where
    F: FnMut(f32, f32) -> BoundingBox,
{
    let mut splits = SmallVec::new();

    match light.light_type() {
        LightType::Directional => {
            let cascade = light.shadow_cascade().splits.to_array();
            let mut near_split = cull_camera.near_clip();
            for &cascade_far in cascade.iter().take(light.num_shadow_splits()) {
                if near_split > cull_camera.far_clip() {
                    break;
                }
                let far_split = cull_camera.far_clip().min(cascade_far);
                if far_split <= near_split {
                    break;
                }
                let camera = setup_directional_shadow_camera(
                    light,
                    cull_camera,
                    near_split,
                    far_split,
                    scene_depth,
                    &mut lit_bounds,
                );
                splits.push(ShadowCameraSplit { camera, near_split, far_split });
                near_split = far_split;
            }
        }
        LightType::Spot => {
            splits.push(ShadowCameraSplit {
                camera: setup_spot_shadow_camera(light),
                near_split: light.shadow_near_far_ratio() * light.range(),
                far_split: light.range(),
            });
        }
        LightType::Point => {
            for camera in setup_point_shadow_cameras(light) {
                splits.push(ShadowCameraSplit {
                    camera,
                    near_split: light.shadow_near_far_ratio() * light.range(),
                    far_split: light.range(),
                });
            }
        }
    }

    splits
}

/// Orthographic camera covering the `near_split..far_split` slice of the view
pub fn setup_directional_shadow_camera<F>(
    light: &Light,
    cull_camera: &Camera,
    near_split: f32,
    far_split: f32,
    scene_depth: (f32, f32),
    lit_bounds: &mut F,
) -> Camera
where
    F: FnMut(f32, f32) -> BoundingBox,
{
    let focus = light.shadow_focus();
    let extrusion = cull_camera.far_clip().min(light.shadow_max_extrusion());

    let mut camera = Camera::new();
    camera.set_position(cull_camera.position() - extrusion * light.direction());
    camera.set_rotation(light.rotation());

    let mut near_split = near_split;
    let mut far_split = far_split.min(cull_camera.far_clip());
    if focus.focus {
        near_split = near_split.max(scene_depth.0);
        far_split = far_split.min(scene_depth.1);
    }

    let split_frustum = cull_camera.split_frustum(near_split, far_split);
    let mut volume = Polyhedron::from_frustum(&split_frustum);
    if focus.focus {
        let lit = lit_bounds(near_split, far_split);
        if lit.is_defined() {
            volume.clip_box(&lit);
            if volume.is_empty() {
                volume = Polyhedron::from_frustum(&split_frustum);
            }
        }
    }

    let volume = volume.transformed(&camera.view());
    let shadow_box = if focus.non_uniform {
        volume.bounding_box()
    } else {
        let points: Vec<Vec3> = volume.faces.iter().flatten().copied().collect();
        let sphere = Sphere::from_points(&points);
        BoundingBox::from_center_half_size(sphere.center, Vec3::splat(sphere.radius))
    };

    camera.set_orthographic(true);
    camera.set_aspect_ratio(1.0);
    camera.set_far_clip(-shadow_box.min.z);

    quantize_directional_shadow_camera(&mut camera, focus, 0, &shadow_box);
    camera
}

/// Perspective camera matching the spot light cone
pub fn setup_spot_shadow_camera(light: &Light) -> Camera {
    let mut camera = Camera::new();
    camera.set_position(light.position());
    camera.set_rotation(light.rotation());
    camera.set_near_clip(light.shadow_near_far_ratio() * light.range());
    camera.set_far_clip(light.range());
    camera.set_fov(light.fov());
    camera.set_aspect_ratio(light.aspect_ratio());
    camera
}

/// Six 90 degree cameras, one per cube face
pub fn setup_point_shadow_cameras(light: &Light) -> [Camera; MAX_LIGHT_SPLITS] {
    POINT_LIGHT_FACES.map(|direction| {
        let mut camera = Camera::new();
        camera.set_position(light.position());
        camera.set_direction(direction);
        camera.set_near_clip(light.shadow_near_far_ratio() * light.range());
        camera.set_far_clip(light.range());
        camera.set_fov(90.0);
        camera.set_aspect_ratio(1.0);
        camera
    })
}

/// Slack absorbing float error when a size already sits on the quantization grid
const QUANTIZE_TOLERANCE: f32 = 0.0001;

fn quantized_size(size: f32, focus: &FocusParameters) -> f32 {
    let steps = ((size / focus.quantize).sqrt() - QUANTIZE_TOLERANCE).ceil();
    (steps * steps * focus.quantize).max(focus.min_view)
}

/// Size the orthographic view to `view_box` (light view space) and center on it.
///
/// With a non-zero `viewport_width` the camera position is also snapped to
/// whole shadow map texels so the shadow does not shimmer as the view moves.
pub fn quantize_directional_shadow_camera(
    camera: &mut Camera,
    focus: &FocusParameters,
    viewport_width: i32,
    view_box: &BoundingBox,
) {
    let center = Vec2::new(view_box.min.x + view_box.max.x, view_box.min.y + view_box.max.y) * 0.5;
    let mut view_size = Vec2::new(view_box.max.x - view_box.min.x, view_box.max.y - view_box.min.y);

    if focus.non_uniform {
        view_size.x = quantized_size(view_size.x, focus);
        view_size.y = quantized_size(view_size.y, focus);
    } else if focus.focus {
        view_size = Vec2::splat(quantized_size(view_size.max_element(), focus));
    }

    camera.set_ortho_extent(view_size.x, view_size.y);

    let rotation = camera.rotation();
    camera.set_position(camera.position() + rotation * center.extend(0.0));

    if viewport_width > 2 {
        // Border texels are not sampled
        let texel = view_size / (viewport_width - 2) as f32;
        let view_position = rotation.inverse() * camera.position();
        let snap = Vec3::new(-(view_position.x % texel.x), -(view_position.y % texel.y), 0.0);
        camera.set_position(camera.position() + rotation * snap);
    }
}

/// Last adjustments once the shadow map viewport is known.
///
/// Directional cameras are re-quantized to texels, focused spot cameras are
/// zoomed onto the projected caster extent, and every camera is zoomed out
/// slightly so the border texels stay unused.
pub fn finalize_shadow_camera(camera: &mut Camera, light: &Light, viewport: IntRect, caster_rect: &Rect) {
    let focus = light.shadow_focus();
    let width = viewport.width();

    match light.light_type() {
        LightType::Directional => {
            let half_height = camera.ortho_size() * 0.5;
            let half_width = camera.aspect_ratio() * half_height;
            let view_box = BoundingBox::new(
                Vec3::new(-half_width, -half_height, 0.0),
                Vec3::new(half_width, half_height, 0.0),
            );
            quantize_directional_shadow_camera(camera, focus, width, &view_box);
        }
        LightType::Spot if focus.focus && caster_rect.is_defined() => {
            let extent = caster_rect.min.abs().max(caster_rect.max.abs()).max_element();
            // Extent is in projection space, so scale the quantization to match
            let inv_ortho_size = 1.0 / camera.ortho_size();
            let quantize = focus.quantize * inv_ortho_size;
            let min_view = focus.min_view * inv_ortho_size;
            let view_size = ((extent / quantize).ceil() * quantize).max(min_view);
            if view_size < 1.0 {
                camera.set_zoom(1.0 / view_size);
            }
        }
        _ => {}
    }

    let border = if light.light_type() == LightType::Point { 4 } else { 2 };
    if camera.zoom() >= 1.0 && width > border {
        let width = width as f32;
        camera.set_zoom(camera.zoom() * ((width - border as f32) / width));
    }
}

/// Whether a caster's shadow can reach the visible part of the view.
///
/// `light_view_box` is the caster bounds in shadow camera view space,
/// `light_view_frustum` the view (or cascade) frustum in the same space and
/// `light_view_frustum_box` its bounds. Orthographic cameras extrude the box
/// away from the light to the far side of the frustum; perspective cameras
/// extrude it along the ray from the light to the far clip distance.
pub fn is_shadow_caster_visible(
    caster_in_view: bool,
    mut light_view_box: BoundingBox,
    shadow_camera: &Camera,
    light_view_frustum: &Frustum,
    light_view_frustum_box: &BoundingBox,
) -> bool {
    if shadow_camera.is_orthographic() {
        light_view_box.min.z = light_view_box.min.z.min(light_view_frustum_box.min.z);
        return light_view_frustum.is_inside_box_fast(&light_view_box) != Intersection::Outside;
    }

    if caster_in_view {
        return true;
    }

    let center = light_view_box.center();
    let direction = center.normalize_or_zero();
    let extrusion = shadow_camera.far_clip();
    let original = center.length().clamp(EPSILON, extrusion.max(EPSILON));
    let size_factor = extrusion / original;

    let extruded = BoundingBox::from_center_half_size(
        direction * extrusion,
        light_view_box.size() * size_factor * 0.5,
    );
    light_view_box.merge(&extruded);
    light_view_frustum.is_inside_box_fast(&light_view_box) != Intersection::Outside
}

#[cfg(test)]
#[path = "shadow_camera_tests.rs"]
mod tests;
