/// Per-light queries: lit geometry, shadow cameras and shadow casters.
///
/// Each visible light is processed independently (and possibly on a worker
/// thread) against read-only frame state, producing a `LightQueryResult`
/// the view turns into light batch queues afterwards.

use std::ops::Range;
use rustc_hash::FxHashMap;
use crate::camera::Camera;
use crate::math::{BoundingBox, Intersection, Rect, Sphere};
use crate::scene::{
    Drawable, DrawableFlags, DrawableKey, FrustumOctreeQuery, LightType, Octree,
    ShadowCasterOctreeQuery, SphereOctreeQuery,
};
use crate::shadow::{is_shadow_caster_visible, setup_shadow_cameras};
use super::visibility::{drawable_distances, VisibleGeometry, VisibleLight};

/// One shadow camera of a light and the casters it renders
#[derive(Debug, Clone)]
pub struct ShadowSplitResult {
    pub camera: Camera,
    pub near_split: f32,
    pub far_split: f32,
    /// Range into `LightQueryResult::shadow_casters`
    pub casters: Range<usize>,
    /// Projected extent of the casters (focused spot lights only)
    pub caster_rect: Rect,
}

#[derive(Debug, Clone)]
pub struct LightQueryResult {
    /// Index into the view's visible lights
    pub light: usize,
    /// Indices into the view's visible geometries
    pub lit_geometries: Vec<usize>,
    pub shadow_casters: Vec<DrawableKey>,
    /// Empty when the light renders unshadowed
    pub shadow_splits: Vec<ShadowSplitResult>,
}

impl LightQueryResult {
    pub fn new(light: usize) -> Self {
        Self {
            light,
            lit_geometries: Vec::new(),
            shadow_casters: Vec::new(),
            shadow_splits: Vec::new(),
        }
    }

    pub fn num_splits(&self) -> usize {
        self.shadow_splits.len()
    }

    pub fn is_shadowed(&self) -> bool {
        !self.shadow_splits.is_empty()
    }

    /// Shadow casters of one split
    pub fn split_casters(&self, split: usize) -> &[DrawableKey] {
        self.shadow_splits
            .get(split)
            .map_or(&[], |split| &self.shadow_casters[split.casters.clone()])
    }
}

/// Read-only frame state shared by all light queries
pub struct LightQueryContext<'a> {
    pub octree: &'a Octree,
    pub cull_camera: &'a Camera,
    pub geometries: &'a [VisibleGeometry],
    pub geometry_lookup: &'a FxHashMap<DrawableKey, usize>,
    pub lights: &'a [VisibleLight],
    /// View depth range of the visible geometry
    pub min_z: f32,
    pub max_z: f32,
    pub draw_shadows: bool,
}

impl LightQueryContext<'_> {
    /// Keep visible geometry matching the light mask
    fn filter_lit(&self, candidates: &[DrawableKey], light_mask: u32, lit: &mut Vec<usize>) {
        lit.extend(candidates.iter().filter_map(|key| {
            let index = *self.geometry_lookup.get(key)?;
            (self.geometries[index].light_mask & light_mask != 0).then_some(index)
        }));
    }

    /// Merged bounds of lit geometry overlapping a view depth range
    fn lit_bounds(&self, light_mask: u32, near: f32, far: f32) -> BoundingBox {
        let mut bounds = BoundingBox::UNDEFINED;
        for geometry in self.geometries {
            if geometry.min_z <= far && geometry.max_z >= near && geometry.light_mask & light_mask != 0 {
                bounds.merge(&geometry.world_box);
            }
        }
        bounds
    }
}

/// Query the lit geometry of a light and, when it casts shadows, set up its
/// shadow cameras and collect the casters of each split.
pub fn process_light(context: &LightQueryContext<'_>, light_index: usize) -> LightQueryResult {
    let mut result = LightQueryResult::new(light_index);
    let Some(visible) = context.lights.get(light_index) else { return result };
    let light = &visible.light;
    let light_mask = light.light_mask();
    let view_mask = context.cull_camera.view_mask();

    let mut shadowed = context.draw_shadows
        && light.cast_shadows()
        && !light.per_vertex()
        && light.shadow_intensity() < 1.0;
    if shadowed && light.shadow_distance() > 0.0 && visible.distance > light.shadow_distance() {
        shadowed = false;
    }

    // Spot and point light queries are reused as shadow caster candidates
    let mut candidates = Vec::new();
    match light.light_type() {
        LightType::Directional => {
            result.lit_geometries.extend(
                context
                    .geometries
                    .iter()
                    .enumerate()
                    .filter(|(_, geometry)| geometry.light_mask & light_mask != 0)
                    .map(|(index, _)| index),
            );
        }
        LightType::Spot => {
            let mut query = FrustumOctreeQuery::new(&mut candidates, light.frustum(), DrawableFlags::GEOMETRY, view_mask);
            context.octree.get_drawables(&mut query);
            context.filter_lit(&candidates, light_mask, &mut result.lit_geometries);
        }
        LightType::Point => {
            let sphere = Sphere::new(light.position(), light.range());
            let mut query = SphereOctreeQuery::new(&mut candidates, sphere, DrawableFlags::GEOMETRY, view_mask);
            context.octree.get_drawables(&mut query);
            context.filter_lit(&candidates, light_mask, &mut result.lit_geometries);
        }
    }

    if result.lit_geometries.is_empty() || !shadowed {
        return result;
    }

    let splits = setup_shadow_cameras(
        light,
        context.cull_camera,
        (context.min_z, context.max_z),
        |near, far| context.lit_bounds(light_mask, near, far),
    );

    let view_frustum = context.cull_camera.frustum();
    for split in splits {
        let start = result.shadow_casters.len();
        let mut caster_rect = Rect::UNDEFINED;
        let shadow_frustum = split.camera.frustum();

        let skip = match light.light_type() {
            LightType::Point => view_frustum.is_inside_box_fast(&shadow_frustum.bounding_box()) == Intersection::Outside,
            LightType::Directional => context.min_z > split.far_split || context.max_z < split.near_split,
            LightType::Spot => false,
        };

        if !skip {
            if light.light_type() == LightType::Directional {
                candidates.clear();
                let mut query = ShadowCasterOctreeQuery::new(&mut candidates, shadow_frustum, view_mask);
                context.octree.get_drawables(&mut query);
            }
            collect_shadow_casters(context, visible, &split.camera, split.near_split, split.far_split, &candidates, &mut result.shadow_casters, &mut caster_rect);
        }

        result.shadow_splits.push(ShadowSplitResult {
            camera: split.camera,
            near_split: split.near_split,
            far_split: split.far_split,
            casters: start..result.shadow_casters.len(),
            caster_rect,
        });
    }

    // No casters: render unshadowed without spending a shadow map
    if result.shadow_casters.is_empty() {
        result.shadow_splits.clear();
    }
    result
}

/// Append the candidates whose shadow can fall into the visible part of the view
#[allow(clippy::too_many_arguments)]
fn collect_shadow_casters(
    context: &LightQueryContext<'_>,
    visible: &VisibleLight,
    shadow_camera: &Camera,
    near_split: f32,
    far_split: f32,
    candidates: &[DrawableKey],
    casters: &mut Vec<DrawableKey>,
    caster_rect: &mut Rect,
) {
    let light = &visible.light;
    let light_type = light.light_type();
    let light_mask = light.light_mask();
    let light_view = shadow_camera.view();
    let light_projection = shadow_camera.projection();
    let shadow_frustum = shadow_camera.frustum();
    let focus_spot = light_type == LightType::Spot && light.shadow_focus().focus;

    // Directional splits only see their own depth slice of the view
    let view_frustum = if light_type == LightType::Directional {
        context
            .cull_camera
            .split_frustum(context.min_z.max(near_split), context.max_z.min(far_split))
    } else {
        context.cull_camera.split_frustum(context.min_z, context.max_z)
    };
    let light_view_frustum = view_frustum.transformed(&light_view);
    if light_view_frustum.vertices[0] == light_view_frustum.vertices[4] {
        return;
    }
    let light_view_frustum_box = light_view_frustum.bounding_box();

    for &key in candidates {
        let Some(drawable) = context.octree.drawable(key) else { continue };
        if !drawable.cast_shadows() || drawable.shadow_mask() & light_mask == 0 {
            continue;
        }
        let world_box = drawable.world_bounding_box();
        if light_type == LightType::Point && shadow_frustum.is_inside_box_fast(&world_box) == Intersection::Outside {
            continue;
        }

        let in_view = context.geometry_lookup.get(&key).copied();
        let distance = match in_view {
            Some(index) => context.geometries[index].distance,
            None => drawable_distances(context.cull_camera, drawable).0,
        };
        let mut max_distance = drawable.shadow_distance();
        let draw_distance = drawable.draw_distance();
        if draw_distance > 0.0 && (max_distance <= 0.0 || draw_distance < max_distance) {
            max_distance = draw_distance;
        }
        if max_distance > 0.0 && distance > max_distance {
            continue;
        }

        let light_view_box = world_box.transformed(&light_view);
        if is_shadow_caster_visible(
            in_view.is_some(),
            light_view_box,
            shadow_camera,
            &light_view_frustum,
            &light_view_frustum_box,
        ) {
            if focus_spot {
                caster_rect.merge(&light_view_box.projected(&light_projection));
            }
            casters.push(key);
        }
    }
}

#[cfg(test)]
#[path = "light_query_tests.rs"]
mod tests;
