/// Batch queues - per-pass collections of batches and instancing groups.
///
/// Opaque queues sort front to back while keeping render state coherent:
/// a first radix pass orders by distance, shader/material/geometry ids are
/// then renumbered in first-seen order, and a second pass sorts on the
/// rewritten state key. Transparent queues sort strictly back to front.

use rdst::RadixSort;
use rustc_hash::FxHashMap;
use smallvec::smallvec;
use crate::camera::Camera;
use crate::math::IntRect;
use crate::scene::GeometryType;
use crate::shadow::ShadowMapHandle;
use super::batch::{Batch, BatchGroup, BatchGroupKey, InstanceTransform};

/// Default instance count up to which group instances are distance sorted
pub const DEFAULT_MAX_SORTED_INSTANCES: usize = 1000;

/// Monotonic unsigned image of an `f32`
fn ordered_distance(distance: f32) -> u32 {
    let bits = distance.to_bits();
    if bits & 0x8000_0000 != 0 { !bits } else { bits | 0x8000_0000 }
}

fn distance_key(render_order: u8, distance: f32, index: usize) -> u128 {
    ((render_order as u128) << 96) | ((ordered_distance(distance) as u128) << 64) | index as u128
}

fn reverse_distance_key(render_order: u8, distance: f32, index: usize) -> u128 {
    ((render_order as u128) << 96) | (((!ordered_distance(distance)) as u128) << 64) | index as u128
}

fn state_key(render_order: u8, sort_key: u64, rank: usize) -> u128 {
    ((render_order as u128) << 120) | ((sort_key as u128) << 56) | (rank as u128 & 0x00ff_ffff_ffff_ffff)
}

fn low_index(key: u128) -> usize {
    (key & u64::MAX as u128) as usize
}

fn batch_itself(batch: &mut Batch) -> &mut Batch {
    batch
}

fn group_batch(group: &mut BatchGroup) -> &mut Batch {
    &mut group.batch
}

/// Id renumbering tables of the two-pass sort
#[derive(Debug, Default)]
struct Remapping {
    shaders: FxHashMap<u32, u32>,
    materials: FxHashMap<u16, u16>,
    geometries: FxHashMap<u16, u16>,
}

impl Remapping {
    fn clear(&mut self) {
        self.shaders.clear();
        self.materials.clear();
        self.geometries.clear();
    }

    /// Renumber the ids of a sort key in first-seen order.
    /// The non-base flag (top bit) is kept.
    fn apply(&mut self, sort_key: u64) -> u64 {
        let shader = (sort_key >> 32) as u32;
        let next_shader = self.shaders.len() as u32;
        let shader = *self.shaders.entry(shader).or_insert((next_shader & 0x7fff_ffff) | (shader & 0x8000_0000));

        let material = ((sort_key >> 16) & 0xffff) as u16;
        let next_material = self.materials.len() as u16;
        let material = *self.materials.entry(material).or_insert(next_material);

        let geometry = (sort_key & 0xffff) as u16;
        let next_geometry = self.geometries.len() as u16;
        let geometry = *self.geometries.entry(geometry).or_insert(next_geometry);

        ((shader as u64) << 32) | ((material as u64) << 16) | geometry as u64
    }
}

/// Distance pass, id renumbering, then state pass over one item list
fn sort_two_pass<T>(
    items: &mut [T],
    order: &mut Vec<usize>,
    remapping: &mut Remapping,
    batch_of: fn(&mut T) -> &mut Batch,
) {
    let mut keys: Vec<u128> = items
        .iter_mut()
        .enumerate()
        .map(|(index, item)| {
            let batch = batch_of(item);
            distance_key(batch.render_order, batch.distance, index)
        })
        .collect();
    keys.radix_sort_unstable();

    remapping.clear();
    let mut by_rank = Vec::with_capacity(keys.len());
    let mut state_keys = Vec::with_capacity(keys.len());
    for (rank, key) in keys.iter().enumerate() {
        let index = low_index(*key);
        let batch = batch_of(&mut items[index]);
        batch.sort_key = remapping.apply(batch.sort_key);
        state_keys.push(state_key(batch.render_order, batch.sort_key, rank));
        by_rank.push(index);
    }
    remapping.clear();

    state_keys.radix_sort_unstable();
    order.clear();
    order.extend(state_keys.iter().map(|key| by_rank[(*key & 0x00ff_ffff_ffff_ffff) as usize]));
}

/// Batches and instancing groups of one pass
#[derive(Debug)]
pub struct BatchQueue {
    batches: Vec<Batch>,
    groups: Vec<BatchGroup>,
    group_lookup: FxHashMap<BatchGroupKey, usize>,
    sorted_batches: Vec<usize>,
    sorted_groups: Vec<usize>,
    max_sorted_instances: usize,
    remapping: Remapping,
}

impl Default for BatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchQueue {
    pub fn new() -> Self {
        Self {
            batches: Vec::new(),
            groups: Vec::new(),
            group_lookup: FxHashMap::default(),
            sorted_batches: Vec::new(),
            sorted_groups: Vec::new(),
            max_sorted_instances: DEFAULT_MAX_SORTED_INSTANCES,
            remapping: Remapping::default(),
        }
    }

    /// Drop all batches for a new frame
    pub fn clear(&mut self, max_sorted_instances: usize) {
        self.batches.clear();
        self.groups.clear();
        self.group_lookup.clear();
        self.sorted_batches.clear();
        self.sorted_groups.clear();
        self.max_sorted_instances = max_sorted_instances;
    }

    /// Queue a batch.
    ///
    /// Indexed static geometry becomes an instancing candidate when
    /// `allow_instancing` is set. Groups keep non-instanced shaders until they
    /// reach `min_instances`. `set_shaders` picks the shader variations for
    /// a batch or group state. Static batches with several transforms that
    /// cannot instance are split into one batch per transform.
    pub fn add_batch<F>(&mut self, mut batch: Batch, allow_instancing: bool, min_instances: usize, mut set_shaders: F)
    where
        F: FnMut(&mut Batch),
    {
        if allow_instancing && batch.geometry_type == GeometryType::Static && batch.indexed {
            batch.geometry_type = GeometryType::Instanced;
        }

        if batch.geometry_type == GeometryType::Instanced {
            let key = BatchGroupKey::new(&batch);
            let index = match self.group_lookup.get(&key) {
                Some(index) => *index,
                None => {
                    let mut group = BatchGroup::new(batch.clone());
                    group.batch.geometry_type = GeometryType::Static;
                    set_shaders(&mut group.batch);
                    group.batch.calculate_sort_key();
                    self.groups.push(group);
                    self.group_lookup.insert(key, self.groups.len() - 1);
                    self.groups.len() - 1
                }
            };

            let group = &mut self.groups[index];
            let old_count = group.instances.len();
            group.add_transforms(&batch);
            if old_count < min_instances && group.instances.len() >= min_instances {
                group.batch.geometry_type = GeometryType::Instanced;
                set_shaders(&mut group.batch);
                group.batch.calculate_sort_key();
            }
            return;
        }

        set_shaders(&mut batch);
        batch.calculate_sort_key();

        if batch.geometry_type == GeometryType::Static && batch.transforms.len() > 1 {
            let transforms = std::mem::take(&mut batch.transforms);
            for transform in transforms {
                let mut single = batch.clone();
                single.transforms = smallvec![transform];
                self.batches.push(single);
            }
        } else {
            self.batches.push(batch);
        }
    }

    /// State-sorted front to back order for batches and groups.
    ///
    /// Group instances are distance sorted up to the configured maximum
    /// count; a group's distance is its nearest instance.
    pub fn sort_front_to_back(&mut self) {
        for group in &mut self.groups {
            if group.instances.len() <= self.max_sorted_instances {
                group.instances.sort_by(|a, b| a.distance.total_cmp(&b.distance));
                if let Some(first) = group.instances.first() {
                    group.batch.distance = first.distance;
                }
            } else {
                group.batch.distance = group
                    .instances
                    .iter()
                    .map(|instance| instance.distance)
                    .fold(f32::INFINITY, f32::min);
            }
        }
        self.sort_front_to_back_2pass();
    }

    /// Two-pass sort: by distance first, then by state keys whose ids were
    /// renumbered in distance order, so equal-state runs stay near to far
    pub fn sort_front_to_back_2pass(&mut self) {
        sort_two_pass(&mut self.batches, &mut self.sorted_batches, &mut self.remapping, batch_itself);
        sort_two_pass(&mut self.groups, &mut self.sorted_groups, &mut self.remapping, group_batch);
    }

    /// Strict far to near order for batches; groups by render order only
    pub fn sort_back_to_front(&mut self) {
        let mut keys: Vec<u128> = self
            .batches
            .iter()
            .enumerate()
            .map(|(index, batch)| reverse_distance_key(batch.render_order, batch.distance, index))
            .collect();
        keys.radix_sort_unstable();
        self.sorted_batches.clear();
        self.sorted_batches.extend(keys.iter().map(|key| low_index(*key)));

        let mut keys: Vec<u128> = self
            .groups
            .iter()
            .enumerate()
            .map(|(index, group)| ((group.batch.render_order as u128) << 64) | index as u128)
            .collect();
        keys.radix_sort_unstable();
        self.sorted_groups.clear();
        self.sorted_groups.extend(keys.iter().map(|key| low_index(*key)));
    }

    /// Append the transforms of every instanced group to the stream
    pub fn set_instancing_data(&mut self, stream: &mut Vec<InstanceTransform>) {
        for group in &mut self.groups {
            if group.is_instanced() {
                group.set_instancing_data(stream);
            } else {
                group.start_index = None;
            }
        }
    }

    pub fn has_batches(&self) -> bool {
        !self.batches.is_empty() || !self.groups.is_empty()
    }

    /// Draw calls issued for the queue
    pub fn num_draw_calls(&self) -> usize {
        let group_calls: usize = self
            .groups
            .iter()
            .map(|group| if group.is_instanced() { 1 } else { group.instances.len() })
            .sum();
        group_calls + self.batches.len()
    }

    /// Instances drawn through hardware instancing
    pub fn num_instances(&self) -> usize {
        self.groups
            .iter()
            .filter(|group| group.is_instanced())
            .map(|group| group.instances.len())
            .sum()
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn groups(&self) -> &[BatchGroup] {
        &self.groups
    }

    /// Batches in sorted order (empty until sorted)
    pub fn sorted_batches(&self) -> impl Iterator<Item = &Batch> {
        self.sorted_batches.iter().map(|index| &self.batches[*index])
    }

    /// Groups in sorted order (empty until sorted)
    pub fn sorted_groups(&self) -> impl Iterator<Item = &BatchGroup> {
        self.sorted_groups.iter().map(|index| &self.groups[*index])
    }
}

/// Shadow casters of one shadow camera
#[derive(Debug)]
pub struct ShadowBatchQueue {
    pub camera: Camera,
    /// Region of the shadow map this split renders to
    pub viewport: IntRect,
    pub batches: BatchQueue,
    /// Cascade range (directional lights only)
    pub near_split: f32,
    pub far_split: f32,
}

/// Draw calls tied to one light.
///
/// Per-pixel queues hold the lit base/additive batches and the shadow
/// splits; vertex light queues only list the vertex lights shared by the
/// batches that reference them.
#[derive(Debug, Default)]
pub struct LightBatchQueue {
    /// Index into the view's visible lights (per-pixel queues only)
    pub light: Option<usize>,
    pub negative: bool,
    pub shadow_map: Option<ShadowMapHandle>,
    /// First light of an object, combined with ambient (replace blending)
    pub lit_base_batches: BatchQueue,
    /// Additive light contributions
    pub lit_batches: BatchQueue,
    pub shadow_splits: Vec<ShadowBatchQueue>,
    /// Indices into the view's visible lights (vertex queues only)
    pub vertex_lights: Vec<usize>,
    /// Lit alpha batches in the alpha queue reference this light
    pub has_lit_alpha: bool,
}

impl LightBatchQueue {
    pub fn for_light(light: usize, negative: bool) -> Self {
        Self { light: Some(light), negative, ..Self::default() }
    }

    pub fn for_vertex_lights(vertex_lights: Vec<usize>) -> Self {
        Self { vertex_lights, ..Self::default() }
    }

    pub fn has_lit_batches(&self) -> bool {
        self.lit_base_batches.has_batches() || self.lit_batches.has_batches()
    }

    /// A shadow map was assigned and something samples it
    pub fn needs_shadow_map(&self) -> bool {
        self.shadow_map.is_some() && (self.has_lit_batches() || self.has_lit_alpha)
    }
}

#[cfg(test)]
#[path = "batch_queue_tests.rs"]
mod tests;
