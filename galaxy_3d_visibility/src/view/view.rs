/// View: per-frame visibility, lighting and batch construction for one camera.
///
/// `define()` binds a camera, a view size and a render path. `update()` then
/// runs the frame phases in order: occluders, drawable query and visibility
/// checks, per-light queries, light batches (with shadow map allocation and
/// shadow split queues), base batches and sorting. `render()` walks the
/// render path and hands the sorted queues to a `DrawSubmitter`.

use std::sync::Arc;
use glam::UVec2;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use crate::batch::{
    Batch, BatchLighting, BatchQueue, InstanceTransform, LightBatchQueue, LightQueueId,
    ShaderCache, ShadowBatchQueue,
};
use crate::camera::Camera;
use crate::error::Result;
use crate::occlusion::OcclusionBuffer;
use crate::render_path::{RenderCommandKind, RenderPath, RenderPathCommand, SortMode};
use crate::resource::{Material, PassIndex, PassRegistry, Technique};
use crate::scene::{
    DrawableFlags, DrawableKey, FrameInfo, FrustumOctreeQuery, OccludedFrustumOctreeQuery,
    OccluderOctreeQuery, Octree, SourceBatch, MAX_VERTEX_LIGHTS,
};
use crate::shadow::{finalize_shadow_camera, shadow_map_size, shadow_map_viewport, ShadowMapAllocator};
use crate::work_queue::{partition, WorkItem, WorkQueue};
use super::draw_submitter::{DrawContext, DrawSubmitter};
use super::light_query::{process_light, LightQueryContext, LightQueryResult};
use super::settings::ViewSettings;
use super::visibility::{
    check_visibility, draw_occluders, drawable_distances, select_occluders,
    VisibilityChunk, VisibleGeometry, VisibleLight,
};

const LOG_SOURCE: &str = "galaxy3d::View";

/// Extra (vertex, pixel) shader defines of a render path command
type CommandDefines = (String, String);

/// A scene pass of the render path
#[derive(Debug, Clone)]
struct ScenePassInfo {
    pass: PassIndex,
    allow_instancing: bool,
    mark_to_stencil: bool,
    vertex_lights: bool,
    sort_mode: SortMode,
    defines: CommandDefines,
}

/// Batch resources of an object that is drawn only as a shadow caster
struct CasterBatches {
    distance: f32,
    lod_distance: f32,
    batches: Vec<SourceBatch>,
}

/// Pick the material of a source batch, falling back to the default material
fn resolve_material(source: &SourceBatch, settings: &ViewSettings) -> Option<Arc<Material>> {
    source.material.clone().or_else(|| settings.default_material.clone())
}

fn select_technique(material: &Arc<Material>, lod_distance: f32, settings: &ViewSettings) -> Option<Arc<Technique>> {
    material.find_technique(lod_distance, settings.material_quality).cloned()
}

/// Queue a batch, resolving its shaders for the given lighting
fn add_batch_to_queue(
    shaders: &mut ShaderCache,
    settings: &ViewSettings,
    queue: &mut BatchQueue,
    batch: Batch,
    allow_instancing: bool,
    lighting: BatchLighting<'_>,
    defines: &CommandDefines,
) {
    let allow_instancing = allow_instancing && settings.dynamic_instancing;
    queue.add_batch(batch, allow_instancing, settings.min_instances, |batch| {
        shaders.set_batch_shaders(batch, lighting, (&defines.0, &defines.1));
    });
}

/// Keep at most `max_lights` per-pixel lights, brightest first; the rest
/// become vertex lights
fn limit_lights(geometry: &mut VisibleGeometry, lights: &[VisibleLight]) {
    let max_lights = geometry.max_lights as usize;
    if max_lights == 0 || geometry.lights.len() <= max_lights {
        return;
    }
    let bounds = geometry.world_box;
    geometry.lights.sort_by(|a, b| {
        let a = lights[*a].light.intensity_sort_value_for_box(&bounds);
        let b = lights[*b].light.intensity_sort_value_for_box(&bounds);
        a.total_cmp(&b)
    });
    let excess: SmallVec<[usize; 4]> = geometry.lights.drain(max_lights..).collect();
    geometry.vertex_lights.extend(excess);
}

/// Keep the brightest `MAX_VERTEX_LIGHTS` vertex lights
fn limit_vertex_lights(geometry: &mut VisibleGeometry, lights: &[VisibleLight]) {
    if geometry.vertex_lights.len() <= MAX_VERTEX_LIGHTS {
        return;
    }
    let bounds = geometry.world_box;
    geometry.vertex_lights.sort_by(|a, b| {
        let a = lights[*a].light.intensity_sort_value_for_box(&bounds);
        let b = lights[*b].light.intensity_sort_value_for_box(&bounds);
        a.total_cmp(&b)
    });
    geometry.vertex_lights.truncate(MAX_VERTEX_LIGHTS);
}

/// Shared state for building the lit batches of one light
struct LitBatchBuilder<'a> {
    shaders: &'a mut ShaderCache,
    settings: &'a ViewSettings,
    lights: &'a [VisibleLight],
    light_pass: PassIndex,
    lit_base_pass: PassIndex,
    lit_alpha_pass: PassIndex,
    use_lit_base: bool,
    forward_defines: &'a CommandDefines,
    alpha_defines: &'a CommandDefines,
}

impl LitBatchBuilder<'_> {
    /// Lit base, additive or lit alpha batches of one geometry for one light
    fn add_lit_batches(
        &mut self,
        geometry: &mut VisibleGeometry,
        light_index: usize,
        queue_index: usize,
        queue: &mut LightBatchQueue,
        mut alpha_queue: Option<&mut BatchQueue>,
    ) {
        let lights = self.lights;
        let light = &lights[light_index].light;
        // Lit base replaces the framebuffer, so it must be the first light
        let allow_lit_base = self.use_lit_base
            && !queue.negative
            && geometry.lights.first() == Some(&light_index)
            && geometry.vertex_lights.is_empty();
        let shadowed = queue.shadow_map.is_some() && !queue.shadow_splits.is_empty();

        for (batch_index, source) in geometry.batches.iter().enumerate() {
            let Some(material) = resolve_material(source, self.settings) else { continue };
            let Some(technique) = select_technique(&material, geometry.lod_distance, self.settings) else { continue };

            let mut is_base = false;
            let mut pass = None;
            if batch_index < 32 && allow_lit_base {
                pass = technique.pass(self.lit_base_pass);
                if pass.is_some() {
                    is_base = true;
                    geometry.lit_base_mask |= 1 << batch_index;
                }
            }
            if pass.is_none() {
                pass = technique.pass(self.light_pass);
            }
            let mut lit_alpha = false;
            if pass.is_none() {
                pass = technique.pass(self.lit_alpha_pass);
                lit_alpha = true;
            }
            let Some(pass) = pass else { continue };

            let mut batch = Batch::new(source, geometry.drawable, Arc::clone(&material), Arc::clone(pass), geometry.distance);
            batch.is_base = is_base;
            batch.zone = geometry.zone;
            batch.light_mask = (geometry.light_mask & 0xff) as u8;
            batch.light_queue = Some(LightQueueId::Pixel(queue_index as u16));

            if !lit_alpha {
                let lighting = BatchLighting { light: Some(light), shadowed, num_vertex_lights: 0 };
                let target = if is_base { &mut queue.lit_base_batches } else { &mut queue.lit_batches };
                add_batch_to_queue(self.shaders, self.settings, target, batch, true, lighting, self.forward_defines);
            } else if let Some(alpha_queue) = alpha_queue.as_deref_mut() {
                // Reused shadow maps are gone by the time transparent geometry draws
                let lighting = BatchLighting {
                    light: Some(light),
                    shadowed: shadowed && !self.settings.shadow.reuse_shadow_maps,
                    num_vertex_lights: 0,
                };
                add_batch_to_queue(self.shaders, self.settings, alpha_queue, batch, false, lighting, self.alpha_defines);
                queue.has_lit_alpha = true;
            }
        }
    }
}

pub struct View {
    work_queue: Arc<dyn WorkQueue>,
    passes: PassRegistry,
    settings: ViewSettings,

    // Definition
    defined: bool,
    camera: Camera,
    view_size: UVec2,
    render_path: RenderPath,
    scene_passes: Vec<ScenePassInfo>,
    base_pass: Option<PassIndex>,
    alpha_pass: Option<PassIndex>,
    light_pass: PassIndex,
    lit_base_pass: PassIndex,
    lit_alpha_pass: PassIndex,
    use_lit_base: bool,
    forward_defines: CommandDefines,
    alpha_defines: CommandDefines,
    has_shadow_maps_command: bool,

    // Frame state
    frame: FrameInfo,
    occlusion_buffer: OcclusionBuffer,
    occluders: Vec<DrawableKey>,
    num_active_occluders: usize,
    geometries: Vec<VisibleGeometry>,
    geometry_lookup: FxHashMap<DrawableKey, usize>,
    lights: Vec<VisibleLight>,
    min_z: f32,
    max_z: f32,
    light_query_results: Vec<LightQueryResult>,
    light_queues: Vec<LightBatchQueue>,
    /// Per-pixel light queue of each visible light
    light_queue_of: Vec<Option<usize>>,
    vertex_light_queues: Vec<LightBatchQueue>,
    vertex_light_lookup: FxHashMap<SmallVec<[usize; MAX_VERTEX_LIGHTS]>, usize>,
    batch_queues: FxHashMap<PassIndex, BatchQueue>,
    shader_cache: ShaderCache,
    shadow_maps: ShadowMapAllocator,
    instancing_data: Vec<InstanceTransform>,
}

impl View {
    pub fn new(work_queue: Arc<dyn WorkQueue>, passes: PassRegistry, settings: ViewSettings) -> Self {
        let settings = settings.validate();
        Self {
            work_queue,
            passes,
            defined: false,
            camera: Camera::new(),
            view_size: UVec2::ZERO,
            render_path: RenderPath::new(),
            scene_passes: Vec::new(),
            base_pass: None,
            alpha_pass: None,
            light_pass: PassIndex::LIGHT,
            lit_base_pass: PassIndex::LIT_BASE,
            lit_alpha_pass: PassIndex::LIT_ALPHA,
            use_lit_base: true,
            forward_defines: CommandDefines::default(),
            alpha_defines: CommandDefines::default(),
            has_shadow_maps_command: false,
            frame: FrameInfo::default(),
            occlusion_buffer: OcclusionBuffer::new(settings.occlusion_buffer_size, settings.occlusion_buffer_size),
            occluders: Vec::new(),
            num_active_occluders: 0,
            geometries: Vec::new(),
            geometry_lookup: FxHashMap::default(),
            lights: Vec::new(),
            min_z: 0.0,
            max_z: 0.0,
            light_query_results: Vec::new(),
            light_queues: Vec::new(),
            light_queue_of: Vec::new(),
            vertex_light_queues: Vec::new(),
            vertex_light_lookup: FxHashMap::default(),
            batch_queues: FxHashMap::default(),
            shader_cache: ShaderCache::new(),
            shadow_maps: ShadowMapAllocator::new(settings.shadow),
            instancing_data: Vec::new(),
            settings,
        }
    }

    // ===== CONFIGURATION =====

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    /// Replace the settings; a changed shadow configuration drops the shadow map pool
    pub fn set_settings(&mut self, settings: ViewSettings) {
        self.settings = settings.validate();
        self.shadow_maps.set_settings(self.settings.shadow);
    }

    pub fn passes(&self) -> &PassRegistry {
        &self.passes
    }

    /// Bind the camera, view size and render path.
    ///
    /// Returns false (and leaves the view inert) for an empty view size.
    pub fn define(&mut self, camera: &Camera, view_size: UVec2, render_path: &RenderPath) -> bool {
        if view_size.x == 0 || view_size.y == 0 {
            crate::engine_debug!(LOG_SOURCE, "Ignoring view definition with empty size {}x{}", view_size.x, view_size.y);
            self.defined = false;
            return false;
        }

        self.camera = camera.clone();
        if self.camera.auto_aspect_ratio() {
            self.camera.set_aspect_ratio(view_size.x as f32 / view_size.y as f32);
        }
        self.view_size = view_size;
        self.render_path = render_path.clone();

        self.scene_passes.clear();
        self.base_pass = None;
        self.alpha_pass = None;
        self.light_pass = PassIndex::LIGHT;
        self.use_lit_base = true;
        self.forward_defines = CommandDefines::default();
        self.alpha_defines = CommandDefines::default();
        self.has_shadow_maps_command = false;

        for command in render_path.enabled_commands() {
            match command.kind {
                RenderCommandKind::ScenePass => {
                    let pass = self.passes.index(&command.pass);
                    let defines = (command.vertex_defines.clone(), command.pixel_defines.clone());
                    if command.metadata.eq_ignore_ascii_case("base") {
                        self.base_pass = Some(pass);
                    } else if command.metadata.eq_ignore_ascii_case("alpha") {
                        self.alpha_pass = Some(pass);
                        self.alpha_defines = defines.clone();
                    }
                    self.batch_queues.entry(pass).or_default();
                    self.scene_passes.push(ScenePassInfo {
                        pass,
                        allow_instancing: command.sort_mode != SortMode::BackToFront,
                        mark_to_stencil: command.mark_to_stencil,
                        vertex_lights: command.vertex_lights,
                        sort_mode: command.sort_mode,
                        defines,
                    });
                }
                RenderCommandKind::ForwardLights => {
                    self.light_pass = self.passes.index(&command.pass);
                    self.use_lit_base = command.use_lit_base;
                    self.forward_defines = (command.vertex_defines.clone(), command.pixel_defines.clone());
                }
                RenderCommandKind::ShadowMaps => self.has_shadow_maps_command = true,
                RenderCommandKind::Clear | RenderCommandKind::Quad => {}
            }
        }

        // Queues of passes no longer in the path
        let scene_passes = &self.scene_passes;
        self.batch_queues.retain(|pass, _| scene_passes.iter().any(|info| info.pass == *pass));

        self.defined = true;
        true
    }

    // ===== FRAME UPDATE =====

    /// Build the visible sets, light queues and sorted batch queues for a frame
    pub fn update(&mut self, octree: &Octree, frame: &FrameInfo) {
        self.reset_frame();
        if !self.defined {
            return;
        }
        self.frame = *frame;

        self.get_drawables(octree);
        self.process_lights(octree);
        self.get_light_batches(octree);
        self.get_base_batches();
        self.sort_batches();

        crate::engine_debug!(
            LOG_SOURCE,
            "Frame {}: {} geometries, {} lights, {} occluders ({} active), {} light queues, {} draw calls",
            self.frame.frame_number,
            self.geometries.len(),
            self.lights.len(),
            self.occluders.len(),
            self.num_active_occluders,
            self.light_queues.len(),
            self.num_draw_calls()
        );
    }

    fn reset_frame(&mut self) {
        let max_sorted = self.settings.max_sorted_instances;
        self.occluders.clear();
        self.num_active_occluders = 0;
        self.geometries.clear();
        self.geometry_lookup.clear();
        self.lights.clear();
        self.min_z = 0.0;
        self.max_z = 0.0;
        self.light_query_results.clear();
        self.light_queues.clear();
        self.light_queue_of.clear();
        self.vertex_light_queues.clear();
        self.vertex_light_lookup.clear();
        for queue in self.batch_queues.values_mut() {
            queue.clear(max_sorted);
        }
        self.instancing_data.clear();
        self.shadow_maps.reset();
    }

    /// Occluders, the drawable query and the threaded visibility checks
    fn get_drawables(&mut self, octree: &Octree) {
        let frustum = self.camera.frustum();
        let view_mask = self.camera.view_mask();

        let mut use_occlusion = false;
        if self.settings.max_occluder_triangles > 0 {
            let mut candidates = Vec::new();
            octree.get_drawables(&mut OccluderOctreeQuery::new(&mut candidates, frustum, view_mask));
            let occluders = select_occluders(octree, &self.camera, self.settings.occluder_size_threshold, &candidates);

            if !occluders.is_empty() {
                let width = self.settings.occlusion_buffer_size;
                let height = ((width as f32 / self.camera.aspect_ratio()).round() as u32).max(1);
                if self.occlusion_buffer.width() != width || self.occlusion_buffer.height() != height {
                    self.occlusion_buffer.set_size(width, height);
                }
                self.occlusion_buffer.set_view(&self.camera);
                self.occlusion_buffer.set_max_triangles(self.settings.max_occluder_triangles);
                self.occlusion_buffer.clear();
                self.num_active_occluders = draw_occluders(octree, &mut self.occlusion_buffer, &occluders);
                use_occlusion = self.num_active_occluders > 0;
            }
            self.occluders.extend(occluders.into_iter().map(|(key, _)| key));
        }

        let flags = DrawableFlags::GEOMETRY | DrawableFlags::LIGHT;
        let mut keys = Vec::new();
        if use_occlusion {
            octree.get_drawables(&mut OccludedFrustumOctreeQuery::new(
                &mut keys,
                frustum,
                &self.occlusion_buffer,
                flags,
                view_mask,
            ));
        } else {
            octree.get_drawables(&mut FrustumOctreeQuery::new(&mut keys, frustum, flags, view_mask));
        }

        let num_threads = if self.settings.threaded { self.work_queue.num_threads() } else { 0 };
        let ranges = partition(keys.len(), num_threads);
        let mut chunks: Vec<VisibilityChunk> = ranges.iter().map(|_| VisibilityChunk::default()).collect();
        {
            let camera = &self.camera;
            let buffer = use_occlusion.then_some(&self.occlusion_buffer);
            let keys = keys.as_slice();
            let items: Vec<WorkItem<'_>> = ranges
                .into_iter()
                .zip(chunks.iter_mut())
                .map(|(range, chunk)| {
                    Box::new(move || check_visibility(octree, camera, buffer, &keys[range], chunk)) as WorkItem<'_>
                })
                .collect();
            self.work_queue.complete(items);
        }

        let mut min_z = f32::INFINITY;
        let mut max_z = 0.0f32;
        for chunk in chunks {
            min_z = min_z.min(chunk.min_z);
            max_z = max_z.max(chunk.max_z);
            self.geometries.extend(chunk.geometries);
            self.lights.extend(chunk.lights);
        }
        self.min_z = if min_z == f32::INFINITY { 0.0 } else { min_z };
        self.max_z = max_z;

        self.geometry_lookup.extend(
            self.geometries
                .iter()
                .enumerate()
                .map(|(index, geometry)| (geometry.drawable, index)),
        );

        // Per-vertex lights first so base passes know their vertex lights
        // before lit base passes are picked; then brightest or closest first
        self.lights.sort_by(|a, b| {
            b.light
                .per_vertex()
                .cmp(&a.light.per_vertex())
                .then(a.sort_value.total_cmp(&b.sort_value))
        });
    }

    /// Run the light queries, one work item per light
    fn process_lights(&mut self, octree: &Octree) {
        let mut results: Vec<LightQueryResult> = (0..self.lights.len()).map(LightQueryResult::new).collect();
        {
            let context = LightQueryContext {
                octree,
                cull_camera: &self.camera,
                geometries: &self.geometries,
                geometry_lookup: &self.geometry_lookup,
                lights: &self.lights,
                min_z: self.min_z,
                max_z: self.max_z,
                draw_shadows: self.settings.draw_shadows,
            };

            if self.settings.threaded && results.len() > 1 {
                let context = &context;
                let items: Vec<WorkItem<'_>> = results
                    .iter_mut()
                    .enumerate()
                    .map(|(index, slot)| Box::new(move || *slot = process_light(context, index)) as WorkItem<'_>)
                    .collect();
                self.work_queue.complete(items);
            } else {
                for (index, slot) in results.iter_mut().enumerate() {
                    *slot = process_light(&context, index);
                }
            }
        }
        self.light_query_results = results;
    }

    /// Per-pixel light queues with their shadow splits and lit batches;
    /// per-vertex lights are recorded on the geometry
    fn get_light_batches(&mut self, octree: &Octree) {
        let View {
            settings,
            camera,
            view_size,
            geometries,
            geometry_lookup,
            lights,
            light_query_results,
            light_queues,
            light_queue_of,
            batch_queues,
            shader_cache,
            shadow_maps,
            alpha_pass,
            light_pass,
            lit_base_pass,
            lit_alpha_pass,
            use_lit_base,
            forward_defines,
            alpha_defines,
            ..
        } = self;
        let settings: &ViewSettings = settings;
        let lights: &[VisibleLight] = lights;
        let max_sorted = settings.max_sorted_instances;

        light_queue_of.resize(lights.len(), None);
        let mut alpha_queue = (*alpha_pass).and_then(|pass| batch_queues.get_mut(&pass));
        let mut caster_batches: FxHashMap<DrawableKey, CasterBatches> = FxHashMap::default();
        let mut max_lights_geometries: Vec<usize> = Vec::new();

        let mut builder = LitBatchBuilder {
            shaders: shader_cache,
            settings,
            lights,
            light_pass: *light_pass,
            lit_base_pass: *lit_base_pass,
            lit_alpha_pass: *lit_alpha_pass,
            use_lit_base: *use_lit_base,
            forward_defines,
            alpha_defines,
        };

        for result in light_query_results.iter() {
            if result.lit_geometries.is_empty() {
                continue;
            }
            let light_index = result.light;
            let light = &lights[light_index].light;

            if light.per_vertex() {
                for &geometry in &result.lit_geometries {
                    geometries[geometry].vertex_lights.push(light_index);
                }
                continue;
            }

            let queue_index = light_queues.len();
            light_queue_of[light_index] = Some(queue_index);
            let mut queue = LightBatchQueue::for_light(light_index, light.is_negative());
            queue.lit_base_batches.clear(max_sorted);
            queue.lit_batches.clear(max_sorted);

            if result.is_shadowed() {
                let size = shadow_map_size(light, camera, *view_size, settings.shadow.shadow_map_size);
                queue.shadow_map = shadow_maps.allocate(size.x, size.y);
                if queue.shadow_map.is_none() {
                    crate::engine_debug!(
                        LOG_SOURCE,
                        "No {}x{} shadow map left for light {}, rendering unshadowed",
                        size.x,
                        size.y,
                        light_index
                    );
                }
            }

            if let Some(shadow_map) = queue.shadow_map {
                for (split_index, split) in result.shadow_splits.iter().enumerate() {
                    let viewport = shadow_map_viewport(light, split_index, &shadow_map);
                    let mut shadow_camera = split.camera.clone();
                    finalize_shadow_camera(&mut shadow_camera, light, viewport, &split.caster_rect);

                    let mut shadow_queue = ShadowBatchQueue {
                        camera: shadow_camera,
                        viewport,
                        batches: BatchQueue::new(),
                        near_split: split.near_split,
                        far_split: split.far_split,
                    };
                    shadow_queue.batches.clear(max_sorted);

                    for &key in result.split_casters(split_index) {
                        let caster = match geometry_lookup.get(&key) {
                            Some(&index) => {
                                let geometry = &geometries[index];
                                (geometry.distance, geometry.lod_distance, geometry.batches.as_slice())
                            }
                            None => {
                                if !caster_batches.contains_key(&key) {
                                    let Some(drawable) = octree.drawable(key) else { continue };
                                    let (distance, lod_distance) = drawable_distances(camera, drawable);
                                    let mut batches = Vec::new();
                                    drawable.collect_batches(lod_distance, &mut batches);
                                    caster_batches.insert(key, CasterBatches { distance, lod_distance, batches });
                                }
                                let Some(entry) = caster_batches.get(&key) else { continue };
                                (entry.distance, entry.lod_distance, entry.batches.as_slice())
                            }
                        };
                        let (distance, lod_distance, sources) = caster;

                        for source in sources {
                            let Some(material) = resolve_material(source, settings) else { continue };
                            let Some(technique) = select_technique(&material, lod_distance, settings) else { continue };
                            let Some(pass) = technique.pass(PassIndex::SHADOW) else { continue };
                            let batch = Batch::new(source, key, Arc::clone(&material), Arc::clone(pass), distance);
                            add_batch_to_queue(
                                builder.shaders,
                                settings,
                                &mut shadow_queue.batches,
                                batch,
                                true,
                                BatchLighting::default(),
                                &CommandDefines::default(),
                            );
                        }
                    }
                    queue.shadow_splits.push(shadow_queue);
                }
            }

            for &index in &result.lit_geometries {
                let geometry = &mut geometries[index];
                geometry.lights.push(light_index);
                if geometry.max_lights == 0 {
                    builder.add_lit_batches(geometry, light_index, queue_index, &mut queue, alpha_queue.as_deref_mut());
                } else {
                    max_lights_geometries.push(index);
                }
            }

            light_queues.push(queue);
        }

        // Lights of max-lights geometry are known only once every light is processed
        max_lights_geometries.sort_unstable();
        max_lights_geometries.dedup();
        for index in max_lights_geometries {
            let geometry = &mut geometries[index];
            limit_lights(geometry, lights);
            let pixel_lights = geometry.lights.clone();
            for light_index in pixel_lights {
                let Some(queue_index) = light_queue_of[light_index] else { continue };
                builder.add_lit_batches(
                    geometry,
                    light_index,
                    queue_index,
                    &mut light_queues[queue_index],
                    alpha_queue.as_deref_mut(),
                );
            }
        }
    }

    /// Index of the vertex light queue for a light set, created on first use
    fn vertex_light_queue(
        queues: &mut Vec<LightBatchQueue>,
        lookup: &mut FxHashMap<SmallVec<[usize; MAX_VERTEX_LIGHTS]>, usize>,
        vertex_lights: &[usize],
    ) -> usize {
        let mut key: SmallVec<[usize; MAX_VERTEX_LIGHTS]> = SmallVec::from_slice(vertex_lights);
        key.sort_unstable();
        *lookup.entry(key).or_insert_with(|| {
            queues.push(LightBatchQueue::for_vertex_lights(vertex_lights.to_vec()));
            queues.len() - 1
        })
    }

    /// Scene pass batches of every visible geometry
    fn get_base_batches(&mut self) {
        let View {
            settings,
            geometries,
            lights,
            scene_passes,
            base_pass,
            batch_queues,
            vertex_light_queues,
            vertex_light_lookup,
            shader_cache,
            ..
        } = self;
        let settings: &ViewSettings = settings;

        for geometry in geometries.iter_mut() {
            limit_vertex_lights(geometry, lights);
            let geometry: &VisibleGeometry = geometry;

            for (batch_index, source) in geometry.batches.iter().enumerate() {
                let Some(material) = resolve_material(source, settings) else { continue };
                let Some(technique) = select_technique(&material, geometry.lod_distance, settings) else { continue };

                for info in scene_passes.iter() {
                    // Already drawn fully by its lit base pass
                    if Some(info.pass) == *base_pass && geometry.has_lit_base(batch_index) {
                        continue;
                    }
                    let Some(pass) = technique.pass(info.pass) else { continue };
                    let Some(queue) = batch_queues.get_mut(&info.pass) else { continue };

                    let mut batch = Batch::new(source, geometry.drawable, Arc::clone(&material), Arc::clone(pass), geometry.distance);
                    batch.is_base = true;
                    batch.zone = geometry.zone;
                    batch.light_mask = (geometry.light_mask & 0xff) as u8;

                    let mut num_vertex_lights = 0;
                    if info.vertex_lights && !geometry.vertex_lights.is_empty() {
                        let queue_index = Self::vertex_light_queue(vertex_light_queues, vertex_light_lookup, &geometry.vertex_lights);
                        batch.light_queue = Some(LightQueueId::Vertex(queue_index as u16));
                        num_vertex_lights = geometry.vertex_lights.len();
                    }

                    // Stencil marking needs the per-object light mask, which instances cannot carry
                    let allow_instancing = info.allow_instancing && !(info.mark_to_stencil && batch.light_mask != u8::MAX);
                    let lighting = BatchLighting { light: None, shadowed: false, num_vertex_lights };
                    add_batch_to_queue(shader_cache, settings, queue, batch, allow_instancing, lighting, &info.defines);
                }
            }
        }
    }

    /// Sort every queue and write the instancing stream
    fn sort_batches(&mut self) {
        for info in &self.scene_passes {
            let Some(queue) = self.batch_queues.get_mut(&info.pass) else { continue };
            match info.sort_mode {
                SortMode::FrontToBack => queue.sort_front_to_back(),
                SortMode::BackToFront => queue.sort_back_to_front(),
            }
        }
        for queue in &mut self.light_queues {
            queue.lit_base_batches.sort_front_to_back();
            queue.lit_batches.sort_front_to_back();
            for split in &mut queue.shadow_splits {
                split.batches.sort_front_to_back();
            }
        }

        let stream = &mut self.instancing_data;
        let mut written: SmallVec<[PassIndex; 8]> = SmallVec::new();
        for info in &self.scene_passes {
            if written.contains(&info.pass) {
                continue;
            }
            written.push(info.pass);
            if let Some(queue) = self.batch_queues.get_mut(&info.pass) {
                queue.set_instancing_data(stream);
            }
        }
        for queue in &mut self.light_queues {
            queue.lit_base_batches.set_instancing_data(stream);
            queue.lit_batches.set_instancing_data(stream);
            for split in &mut queue.shadow_splits {
                split.batches.set_instancing_data(stream);
            }
        }
    }

    // ===== RENDERING =====

    /// Execute the render path.
    ///
    /// In multi-map mode all shadow maps render at the `ShadowMaps` command
    /// (or first thing when the path has none); in reuse mode each light's
    /// map renders right before its forward light batches.
    pub fn render(&self, submitter: &mut dyn DrawSubmitter) -> Result<()> {
        if !self.defined {
            return Ok(());
        }

        let reuse = self.settings.shadow.reuse_shadow_maps;
        let mut shadow_maps_rendered = false;
        if !reuse && !self.has_shadow_maps_command {
            self.render_shadow_maps(submitter)
                .map_err(|err| crate::engine_err!(LOG_SOURCE, "Shadow map rendering failed: {}", err))?;
            shadow_maps_rendered = true;
        }

        for command in self.render_path.enabled_commands() {
            let result = match command.kind {
                RenderCommandKind::Clear => submitter.set_render_targets(&command.outputs).and_then(|_| {
                    submitter.clear(command.clear_flags, command.clear_color, command.clear_depth, command.clear_stencil)
                }),
                RenderCommandKind::ScenePass => self.render_scene_pass(submitter, command),
                RenderCommandKind::ForwardLights => self.render_forward_lights(submitter, command),
                RenderCommandKind::ShadowMaps => {
                    if !reuse && !shadow_maps_rendered {
                        shadow_maps_rendered = true;
                        self.render_shadow_maps(submitter)
                    } else {
                        Ok(())
                    }
                }
                RenderCommandKind::Quad => submitter
                    .set_render_targets(&command.outputs)
                    .and_then(|_| submitter.draw_fullscreen_quad(command)),
            };
            result.map_err(|err| {
                crate::engine_err!(LOG_SOURCE, "Render command {:?} '{}' failed: {}", command.kind, command.tag, err)
            })?;
        }
        Ok(())
    }

    fn render_scene_pass(&self, submitter: &mut dyn DrawSubmitter, command: &RenderPathCommand) -> Result<()> {
        let Some(pass) = self.passes.find(&command.pass) else { return Ok(()) };
        let Some(queue) = self.batch_queues.get(&pass) else { return Ok(()) };
        if !queue.has_batches() {
            return Ok(());
        }
        submitter.set_render_targets(&command.outputs)?;
        let allow_shadows = !self.settings.shadow.reuse_shadow_maps;
        self.draw_queue(submitter, queue, &self.camera, command.mark_to_stencil, allow_shadows)
    }

    fn render_forward_lights(&self, submitter: &mut dyn DrawSubmitter, command: &RenderPathCommand) -> Result<()> {
        let reuse = self.settings.shadow.reuse_shadow_maps;
        for queue in &self.light_queues {
            if reuse && queue.needs_shadow_map() {
                self.render_shadow_map(submitter, queue)?;
            }
            if !queue.has_lit_batches() {
                continue;
            }
            submitter.set_render_targets(&command.outputs)?;
            self.draw_queue(submitter, &queue.lit_base_batches, &self.camera, false, true)?;
            self.draw_queue(submitter, &queue.lit_batches, &self.camera, false, true)?;
        }
        Ok(())
    }

    fn render_shadow_maps(&self, submitter: &mut dyn DrawSubmitter) -> Result<()> {
        for queue in self.light_queues.iter().filter(|queue| queue.needs_shadow_map()) {
            self.render_shadow_map(submitter, queue)?;
        }
        Ok(())
    }

    fn render_shadow_map(&self, submitter: &mut dyn DrawSubmitter, queue: &LightBatchQueue) -> Result<()> {
        let Some(shadow_map) = queue.shadow_map else { return Ok(()) };
        submitter.begin_shadow_map(&shadow_map)?;
        for split in &queue.shadow_splits {
            submitter.set_shadow_split(split.viewport, &split.camera)?;
            self.draw_queue(submitter, &split.batches, &split.camera, false, false)?;
        }
        Ok(())
    }

    /// Lights, shadow map and vertex lights referenced by a batch's light queue
    fn draw_context<'a>(
        &'a self,
        camera: &'a Camera,
        light_queue: Option<LightQueueId>,
        mark_to_stencil: bool,
        allow_shadows: bool,
    ) -> DrawContext<'a> {
        let mut context = DrawContext::new(camera, &self.shader_cache, &self.instancing_data);
        context.mark_to_stencil = mark_to_stencil;
        match light_queue {
            Some(LightQueueId::Pixel(index)) => {
                if let Some(queue) = self.light_queues.get(index as usize) {
                    context.light = queue.light.and_then(|light| self.lights.get(light)).map(|visible| &visible.light);
                    if allow_shadows && !queue.shadow_splits.is_empty() {
                        context.shadow_map = queue.shadow_map;
                    }
                }
            }
            Some(LightQueueId::Vertex(index)) => {
                if let Some(queue) = self.vertex_light_queues.get(index as usize) {
                    context.vertex_lights = queue
                        .vertex_lights
                        .iter()
                        .filter_map(|light| self.lights.get(*light))
                        .map(|visible| &visible.light)
                        .collect();
                }
            }
            None => {}
        }
        context
    }

    /// Groups first, then single batches, each in sorted order
    fn draw_queue(
        &self,
        submitter: &mut dyn DrawSubmitter,
        queue: &BatchQueue,
        camera: &Camera,
        mark_to_stencil: bool,
        allow_shadows: bool,
    ) -> Result<()> {
        for group in queue.sorted_groups() {
            if !group.batch.is_drawable() {
                continue;
            }
            let context = self.draw_context(camera, group.batch.light_queue, mark_to_stencil, allow_shadows);
            if group.is_instanced() {
                submitter.draw_batch_group(group, &context)?;
            } else {
                for instance in &group.instances {
                    submitter.draw_batch(&group.batch, std::slice::from_ref(&instance.transform), &context)?;
                }
            }
        }
        for batch in queue.sorted_batches() {
            if !batch.is_drawable() {
                continue;
            }
            let context = self.draw_context(camera, batch.light_queue, mark_to_stencil, allow_shadows);
            submitter.draw_batch(batch, &batch.transforms, &context)?;
        }
        Ok(())
    }

    // ===== DIAGNOSTICS =====

    pub fn is_defined(&self) -> bool {
        self.defined
    }

    /// Culling camera, with the aspect ratio applied by `define`
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn view_size(&self) -> UVec2 {
        self.view_size
    }

    pub fn frame(&self) -> &FrameInfo {
        &self.frame
    }

    pub fn geometries(&self) -> &[VisibleGeometry] {
        &self.geometries
    }

    pub fn geometry(&self, key: DrawableKey) -> Option<&VisibleGeometry> {
        self.geometry_lookup.get(&key).map(|index| &self.geometries[*index])
    }

    /// Visible lights in processing order
    pub fn lights(&self) -> &[VisibleLight] {
        &self.lights
    }

    /// Occluders selected this frame, near to far
    pub fn occluders(&self) -> &[DrawableKey] {
        &self.occluders
    }

    /// Occluders actually rasterized
    pub fn num_active_occluders(&self) -> usize {
        self.num_active_occluders
    }

    pub fn occlusion_buffer(&self) -> Option<&OcclusionBuffer> {
        (self.num_active_occluders > 0).then_some(&self.occlusion_buffer)
    }

    pub fn light_query_results(&self) -> &[LightQueryResult] {
        &self.light_query_results
    }

    pub fn light_queues(&self) -> &[LightBatchQueue] {
        &self.light_queues
    }

    /// Per-pixel light queue of a visible light
    pub fn light_queue(&self, light_index: usize) -> Option<&LightBatchQueue> {
        let index = (*self.light_queue_of.get(light_index)?)?;
        self.light_queues.get(index)
    }

    pub fn vertex_light_queues(&self) -> &[LightBatchQueue] {
        &self.vertex_light_queues
    }

    pub fn batch_queue(&self, pass: PassIndex) -> Option<&BatchQueue> {
        self.batch_queues.get(&pass)
    }

    pub fn batch_queue_by_name(&self, pass: &str) -> Option<&BatchQueue> {
        self.batch_queue(self.passes.find(pass)?)
    }

    /// Nearest view depth of the visible geometry
    pub fn min_z(&self) -> f32 {
        self.min_z
    }

    /// Farthest view depth of the visible geometry
    pub fn max_z(&self) -> f32 {
        self.max_z
    }

    pub fn shader_cache(&self) -> &ShaderCache {
        &self.shader_cache
    }

    pub fn instancing_data(&self) -> &[InstanceTransform] {
        &self.instancing_data
    }

    pub fn shadow_map_allocator(&self) -> &ShadowMapAllocator {
        &self.shadow_maps
    }

    /// Draw calls of the scene passes and light queues, shadow maps excluded
    pub fn num_draw_calls(&self) -> usize {
        let scene: usize = self.batch_queues.values().map(BatchQueue::num_draw_calls).sum();
        let lit: usize = self
            .light_queues
            .iter()
            .map(|queue| queue.lit_base_batches.num_draw_calls() + queue.lit_batches.num_draw_calls())
            .sum();
        scene + lit
    }
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;
