/// Octree - loose spatial index over drawables.
///
/// Octants live in an arena (`Vec<Octant>` plus a free list) and refer
/// to each other by index. Each octant's culling box is its world box
/// expanded by half its size, so objects up to twice the octant size can
/// still be held by it. Drawables are owned by the octree in a slot map and
/// referenced from octants by `DrawableKey`.
///
/// Per-frame `update()`:
/// 1. pending drawables run their `update()` in parallel over contiguous slices
/// 2. drawables queued during step 1 are updated on the calling thread
/// 3. update-finished hooks run
/// 4. pending drawables whose bounds left their octant are reinserted

use std::sync::{Arc, Mutex};
use glam::Vec3;
use slotmap::SlotMap;
use crate::math::{BoundingBox, Intersection};
use crate::work_queue::{partition, WorkItem, WorkQueue};
use super::drawable::{Drawable, DrawableKey, DrawableObject, FrameInfo, UpdateContext};
use super::octree_query::{OctreeQuery, RayOctreeQuery, RayQueryResult};

/// Default half extent of the root octant
pub const DEFAULT_OCTREE_SIZE: f32 = 1000.0;
/// Default subdivision depth
pub const DEFAULT_OCTREE_LEVELS: u32 = 8;
/// Children per octant
pub const NUM_OCTANTS: usize = 8;
/// Arena index of the root octant
pub const ROOT_INDEX: OctantIndex = 0;

/// Arena index of an octant
pub type OctantIndex = usize;

/// Hook run after drawable updates and before reinsertion
pub type UpdateFinishedHook = Box<dyn FnMut(&FrameInfo, &mut DrawableAccess<'_>) + Send + Sync>;

/// Octree configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeDesc {
    pub bounds: BoundingBox,
    pub num_levels: u32,
}

impl Default for OctreeDesc {
    fn default() -> Self {
        Self {
            bounds: BoundingBox::from_extent(DEFAULT_OCTREE_SIZE),
            num_levels: DEFAULT_OCTREE_LEVELS,
        }
    }
}

impl OctreeDesc {
    /// Clamp values into a usable range
    pub fn validate(mut self) -> Self {
        self.num_levels = self.num_levels.max(1);
        if !self.bounds.is_valid() {
            self.bounds = BoundingBox::from_extent(DEFAULT_OCTREE_SIZE);
        }
        self
    }
}

// ===== OCTANT =====

/// One node of the octree
#[derive(Debug, Clone)]
pub struct Octant {
    world_bounding_box: BoundingBox,
    culling_box: BoundingBox,
    center: Vec3,
    half_size: Vec3,
    level: u32,
    parent: Option<OctantIndex>,
    index_in_parent: usize,
    children: [Option<OctantIndex>; NUM_OCTANTS],
    drawables: Vec<DrawableKey>,
    /// Drawables held by this octant and all its descendants
    num_drawables: usize,
}

impl Octant {
    fn new(bounds: BoundingBox, level: u32, parent: Option<OctantIndex>, index_in_parent: usize) -> Self {
        let mut octant = Self {
            world_bounding_box: bounds,
            culling_box: bounds,
            center: Vec3::ZERO,
            half_size: Vec3::ZERO,
            level,
            parent,
            index_in_parent,
            children: [None; NUM_OCTANTS],
            drawables: Vec::new(),
            num_drawables: 0,
        };
        octant.initialize(bounds);
        octant
    }

    fn initialize(&mut self, bounds: BoundingBox) {
        self.world_bounding_box = bounds;
        self.center = bounds.center();
        self.half_size = bounds.half_size();
        self.culling_box = bounds.expanded(self.half_size);
    }

    pub fn world_bounding_box(&self) -> &BoundingBox {
        &self.world_bounding_box
    }

    pub fn culling_box(&self) -> &BoundingBox {
        &self.culling_box
    }

    pub fn center(&self) -> Vec3 {
        self.center
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn parent(&self) -> Option<OctantIndex> {
        self.parent
    }

    pub fn children(&self) -> &[Option<OctantIndex>; NUM_OCTANTS] {
        &self.children
    }

    /// Drawables held directly by this octant
    pub fn drawables(&self) -> &[DrawableKey] {
        &self.drawables
    }

    /// Drawables held by this octant and its descendants
    pub fn num_drawables(&self) -> usize {
        self.num_drawables
    }

    /// Bounds of one child octant (bit0 = +X, bit1 = +Y, bit2 = +Z)
    fn child_bounds(&self, index: usize) -> BoundingBox {
        let mut min = self.world_bounding_box.min;
        let mut max = self.world_bounding_box.max;
        if index & 1 != 0 { min.x = self.center.x } else { max.x = self.center.x }
        if index & 2 != 0 { min.y = self.center.y } else { max.y = self.center.y }
        if index & 4 != 0 { min.z = self.center.z } else { max.z = self.center.z }
        BoundingBox::new(min, max)
    }

    /// Child slot receiving a box centered at `point`
    fn child_index(&self, point: Vec3) -> usize {
        let x = if point.x < self.center.x { 0 } else { 1 };
        let y = if point.y < self.center.y { 0 } else { 2 };
        let z = if point.z < self.center.z { 0 } else { 4 };
        x + y + z
    }
}

// ===== DRAWABLE STORAGE =====

pub(crate) struct DrawableEntry {
    /// Taken out while a threaded update runs
    object: Option<Box<dyn DrawableObject>>,
    octant: Option<OctantIndex>,
    update_queued: bool,
    manual: bool,
}

/// Mutable access to drawables from update-finished hooks.
///
/// Every mutable borrow queues the drawable for reinsertion.
pub struct DrawableAccess<'a> {
    octree: &'a mut Octree,
}

impl DrawableAccess<'_> {
    pub fn drawable(&self, key: DrawableKey) -> Option<&dyn Drawable> {
        self.octree.drawable(key)
    }

    pub fn get<T: Drawable + 'static>(&self, key: DrawableKey) -> Option<&T> {
        self.octree.get::<T>(key)
    }

    pub fn get_mut<T: Drawable + 'static>(&mut self, key: DrawableKey) -> Option<&mut T> {
        self.octree.get_mut::<T>(key)
    }
}

// ===== OCTREE =====

pub struct Octree {
    octants: Vec<Octant>,
    free_octants: Vec<OctantIndex>,
    drawables: SlotMap<DrawableKey, DrawableEntry>,
    /// Drawables to update and reinsert this frame
    drawable_updates: Vec<DrawableKey>,
    /// Requests made from drawable updates, merged on the main thread
    threaded_drawable_updates: Mutex<Vec<DrawableKey>>,
    num_levels: u32,
    work_queue: Arc<dyn WorkQueue>,
    update_finished_hooks: Vec<UpdateFinishedHook>,
}

impl Octree {
    /// Create an octree with the given bounds and depth
    pub fn new(desc: OctreeDesc, work_queue: Arc<dyn WorkQueue>) -> Self {
        let desc = desc.validate();
        Self {
            octants: vec![Octant::new(desc.bounds, 0, None, 0)],
            free_octants: Vec::new(),
            drawables: SlotMap::with_key(),
            drawable_updates: Vec::new(),
            threaded_drawable_updates: Mutex::new(Vec::new()),
            num_levels: desc.num_levels,
            work_queue,
            update_finished_hooks: Vec::new(),
        }
    }

    // ===== CONFIGURATION =====

    /// Resize the tree. Existing drawables are moved to the root and queued for reinsertion.
    pub fn set_size(&mut self, bounds: BoundingBox, num_levels: u32) {
        for slot in 0..NUM_OCTANTS {
            self.delete_child(ROOT_INDEX, slot);
        }

        let root = self.octant_mut(ROOT_INDEX);
        root.initialize(bounds);
        root.num_drawables = root.drawables.len();
        self.num_levels = num_levels.max(1);

        crate::engine_debug!(
            "galaxy3d::Octree",
            "Resized to {:?}..{:?} with {} levels",
            bounds.min,
            bounds.max,
            self.num_levels
        );
    }

    pub fn num_levels(&self) -> u32 {
        self.num_levels
    }

    pub fn world_bounding_box(&self) -> &BoundingBox {
        &self.octant(ROOT_INDEX).world_bounding_box
    }

    pub fn add_update_finished_hook(&mut self, hook: UpdateFinishedHook) {
        self.update_finished_hooks.push(hook);
    }

    // ===== DRAWABLES =====

    /// Insert a drawable at its current bounds and queue its first update
    pub fn insert<T: Drawable + 'static>(&mut self, drawable: T) -> DrawableKey {
        let bounds = drawable.world_bounding_box();
        let occludee = drawable.is_occludee();
        let key = self.drawables.insert(DrawableEntry {
            object: Some(Box::new(drawable)),
            octant: None,
            update_queued: false,
            manual: false,
        });
        self.insert_drawable(key, &bounds, occludee);
        self.queue_update(key);
        key
    }

    /// Insert a drawable pinned to the root: never updated nor reinserted
    pub fn insert_manual<T: Drawable + 'static>(&mut self, drawable: T) -> DrawableKey {
        let key = self.drawables.insert(DrawableEntry {
            object: Some(Box::new(drawable)),
            octant: None,
            update_queued: false,
            manual: true,
        });
        self.add_to_octant(ROOT_INDEX, key);
        key
    }

    /// Remove a drawable, returning it if it existed
    pub fn remove(&mut self, key: DrawableKey) -> Option<Box<dyn Drawable>> {
        self.cancel_update(key);
        let octant = self.drawables.get(key)?.octant;
        if let Some(octant) = octant {
            self.remove_from_octant(octant, key);
        }
        let entry = self.drawables.remove(key)?;
        entry.object.map(|object| object.into_drawable())
    }

    pub fn contains(&self, key: DrawableKey) -> bool {
        self.drawables.contains_key(key)
    }

    pub fn num_drawables(&self) -> usize {
        self.drawables.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = DrawableKey> + '_ {
        self.drawables.keys()
    }

    pub fn drawable(&self, key: DrawableKey) -> Option<&dyn Drawable> {
        self.drawables.get(key)?.object.as_deref().map(|object| object.as_drawable())
    }

    /// Mutable access through the trait; queues the drawable for reinsertion
    pub fn drawable_mut(&mut self, key: DrawableKey) -> Option<&mut dyn Drawable> {
        self.queue_update(key);
        self.drawables.get_mut(key)?.object.as_deref_mut().map(|object| object.as_drawable_mut())
    }

    pub fn get<T: Drawable + 'static>(&self, key: DrawableKey) -> Option<&T> {
        self.drawables.get(key)?.object.as_deref()?.as_any().downcast_ref::<T>()
    }

    /// Mutable access to the concrete type; queues the drawable for reinsertion
    pub fn get_mut<T: Drawable + 'static>(&mut self, key: DrawableKey) -> Option<&mut T> {
        self.queue_update(key);
        self.drawables.get_mut(key)?.object.as_deref_mut()?.as_any_mut().downcast_mut::<T>()
    }

    /// Queue a drawable for update and reinsertion on the next `update()`
    pub fn queue_update(&mut self, key: DrawableKey) {
        if let Some(entry) = self.drawables.get_mut(key) {
            if !entry.update_queued && !entry.manual {
                entry.update_queued = true;
                self.drawable_updates.push(key);
            }
        }
    }

    pub fn cancel_update(&mut self, key: DrawableKey) {
        if let Some(entry) = self.drawables.get_mut(key) {
            if entry.update_queued {
                entry.update_queued = false;
                self.drawable_updates.retain(|queued| *queued != key);
            }
        }
    }

    pub fn num_pending_updates(&self) -> usize {
        self.drawable_updates.len()
    }

    // ===== DIAGNOSTICS =====

    /// Octant currently holding a drawable
    pub fn octant_of(&self, key: DrawableKey) -> Option<OctantIndex> {
        self.drawables.get(key)?.octant
    }

    pub fn octant(&self, index: OctantIndex) -> &Octant {
        &self.octants[index]
    }

    pub fn try_octant(&self, index: OctantIndex) -> Option<&Octant> {
        if self.free_octants.contains(&index) {
            return None;
        }
        self.octants.get(index)
    }

    /// Culling box of the octant holding a drawable
    pub fn octant_culling_box(&self, key: DrawableKey) -> Option<BoundingBox> {
        Some(self.octant(self.octant_of(key)?).culling_box)
    }

    /// Depth of the octant holding a drawable (root = 0)
    pub fn octant_level(&self, key: DrawableKey) -> Option<u32> {
        Some(self.octant(self.octant_of(key)?).level)
    }

    /// Number of live octants, root included
    pub fn num_octants(&self) -> usize {
        self.octants.len() - self.free_octants.len()
    }

    // ===== PER-FRAME UPDATE =====

    /// Update queued drawables, run hooks and reinsert moved drawables
    pub fn update(&mut self, frame: &FrameInfo) {
        if !self.drawable_updates.is_empty() {
            self.update_drawables_threaded(frame);
        }

        self.update_drawables_queued_during_update(frame);

        if !self.update_finished_hooks.is_empty() {
            let mut hooks = std::mem::take(&mut self.update_finished_hooks);
            {
                let mut access = DrawableAccess { octree: self };
                for hook in hooks.iter_mut() {
                    hook(frame, &mut access);
                }
            }
            hooks.append(&mut self.update_finished_hooks);
            self.update_finished_hooks = hooks;
        }

        self.reinsert_drawables();
    }

    fn update_drawables_threaded(&mut self, frame: &FrameInfo) {
        let mut pending: Vec<(DrawableKey, Box<dyn DrawableObject>)> = Vec::with_capacity(self.drawable_updates.len());
        for key in &self.drawable_updates {
            if let Some(object) = self.drawables.get_mut(*key).and_then(|entry| entry.object.take()) {
                pending.push((*key, object));
            }
        }

        {
            let context = UpdateContext::new(frame, &self.threaded_drawable_updates);
            let context = &context;
            let ranges = partition(pending.len(), self.work_queue.num_threads());
            let mut items: Vec<WorkItem<'_>> = Vec::with_capacity(ranges.len());
            let mut rest = pending.as_mut_slice();
            for range in ranges {
                let (chunk, tail) = rest.split_at_mut(range.len());
                rest = tail;
                items.push(Box::new(move || {
                    for (_, object) in chunk.iter_mut() {
                        object.update(context);
                    }
                }));
            }
            self.work_queue.complete(items);
        }

        for (key, object) in pending {
            if let Some(entry) = self.drawables.get_mut(key) {
                entry.object = Some(object);
            }
        }
    }

    fn update_drawables_queued_during_update(&mut self, frame: &FrameInfo) {
        let requested = Self::drain(&self.threaded_drawable_updates);
        if requested.is_empty() {
            return;
        }

        {
            let context = UpdateContext::new(frame, &self.threaded_drawable_updates);
            for key in requested {
                let Some(entry) = self.drawables.get_mut(key) else { continue };
                if entry.update_queued || entry.manual {
                    continue;
                }
                entry.update_queued = true;
                if let Some(object) = entry.object.as_deref_mut() {
                    object.update(&context);
                }
                self.drawable_updates.push(key);
            }
        }

        // Requests made by main-thread updates are reinserted without another update
        for key in Self::drain(&self.threaded_drawable_updates) {
            self.queue_update(key);
        }
    }

    fn drain(list: &Mutex<Vec<DrawableKey>>) -> Vec<DrawableKey> {
        let mut guard = list.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *guard)
    }

    fn reinsert_drawables(&mut self) {
        let mut updates = std::mem::take(&mut self.drawable_updates);

        for &key in &updates {
            let Some(entry) = self.drawables.get_mut(key) else { continue };
            entry.update_queued = false;
            let Some(octant) = entry.octant else { continue };
            let Some(object) = entry.object.as_deref() else { continue };

            let bounds = object.world_bounding_box();
            let occludee = object.is_occludee();

            if occludee
                && self.octant(octant).culling_box.is_inside_box(&bounds) == Intersection::Inside
                && self.check_fit(octant, &bounds)
            {
                continue;
            }

            self.insert_drawable(key, &bounds, occludee);

            #[cfg(debug_assertions)]
            self.verify_containment(key, &bounds);
        }

        updates.clear();
        if self.drawable_updates.is_empty() {
            self.drawable_updates = updates;
        }
    }

    #[cfg(debug_assertions)]
    fn verify_containment(&self, key: DrawableKey, bounds: &BoundingBox) {
        if let Some(octant) = self.octant_of(key) {
            let culling_box = self.octant(octant).culling_box;
            if octant != ROOT_INDEX && culling_box.is_inside_box(bounds) != Intersection::Inside {
                crate::engine_error!(
                    "galaxy3d::Octree",
                    "Drawable is not fully inside its octant's culling bounds: drawable box {:?}..{:?} octant box {:?}..{:?}",
                    bounds.min,
                    bounds.max,
                    culling_box.min,
                    culling_box.max
                );
            }
        }
    }

    // ===== INSERTION =====

    /// Walk down from the root and store the drawable at the first octant it fits
    fn insert_drawable(&mut self, key: DrawableKey, bounds: &BoundingBox, occludee: bool) {
        let mut index = ROOT_INDEX;
        loop {
            let insert_here = if index == ROOT_INDEX {
                !occludee
                    || !bounds.is_defined()
                    || self.octant(index).culling_box.is_inside_box(bounds) != Intersection::Inside
                    || self.check_fit(index, bounds)
            } else {
                self.check_fit(index, bounds)
            };

            if insert_here {
                let old = self.drawables.get(key).and_then(|entry| entry.octant);
                if old != Some(index) {
                    // Add first, then remove: emptying the old octant may prune its branch
                    self.add_to_octant(index, key);
                    if let Some(old) = old {
                        self.remove_from_octant(old, key);
                    }
                }
                return;
            }

            let slot = self.octant(index).child_index(bounds.center());
            index = self.get_or_create_child(index, slot);
        }
    }

    /// True when `bounds` should stay at this octant rather than go to a child
    fn check_fit(&self, index: OctantIndex, bounds: &BoundingBox) -> bool {
        let octant = self.octant(index);
        let size = bounds.size();

        if octant.level >= self.num_levels
            || size.x >= octant.half_size.x
            || size.y >= octant.half_size.y
            || size.z >= octant.half_size.z
        {
            return true;
        }

        // Cannot fit the union of the children's culling boxes
        let margin = octant.half_size * 0.5;
        let world = &octant.world_bounding_box;
        bounds.min.cmple(world.min - margin).any() || bounds.max.cmpge(world.max + margin).any()
    }

    fn get_or_create_child(&mut self, parent: OctantIndex, slot: usize) -> OctantIndex {
        if let Some(child) = self.octant(parent).children[slot] {
            return child;
        }

        let parent_octant = self.octant(parent);
        let child = Octant::new(parent_octant.child_bounds(slot), parent_octant.level + 1, Some(parent), slot);
        let index = match self.free_octants.pop() {
            Some(index) => {
                self.octants[index] = child;
                index
            }
            None => {
                self.octants.push(child);
                self.octants.len() - 1
            }
        };
        self.octant_mut(parent).children[slot] = Some(index);
        index
    }

    fn add_to_octant(&mut self, index: OctantIndex, key: DrawableKey) {
        if let Some(entry) = self.drawables.get_mut(key) {
            entry.octant = Some(index);
        }
        self.octant_mut(index).drawables.push(key);

        let mut current = Some(index);
        while let Some(octant_index) = current {
            let octant = self.octant_mut(octant_index);
            octant.num_drawables += 1;
            current = octant.parent;
        }
    }

    fn remove_from_octant(&mut self, index: OctantIndex, key: DrawableKey) {
        let octant = self.octant_mut(index);
        let Some(position) = octant.drawables.iter().position(|held| *held == key) else { return };
        octant.drawables.swap_remove(position);

        if let Some(entry) = self.drawables.get_mut(key) {
            if entry.octant == Some(index) {
                entry.octant = None;
            }
        }

        // Decrement counts up to the root, pruning branches that become empty
        let mut current = Some(index);
        while let Some(octant_index) = current {
            let octant = self.octant_mut(octant_index);
            octant.num_drawables -= 1;
            let (parent, slot, empty) = (octant.parent, octant.index_in_parent, octant.num_drawables == 0);
            if empty {
                if let Some(parent) = parent {
                    self.delete_child(parent, slot);
                }
            }
            current = parent;
        }
    }

    /// Free a child subtree without recursion. Any drawables still held in
    /// it are moved to the root and queued for reinsertion.
    fn delete_child(&mut self, parent: OctantIndex, slot: usize) {
        let Some(child) = self.octant_mut(parent).children[slot].take() else { return };

        let mut stack = vec![child];
        while let Some(index) = stack.pop() {
            let octant = &mut self.octants[index];
            let drawables = std::mem::take(&mut octant.drawables);
            let children = std::mem::replace(&mut octant.children, [None; NUM_OCTANTS]);
            octant.num_drawables = 0;
            self.free_octants.push(index);

            for key in drawables {
                if let Some(entry) = self.drawables.get_mut(key) {
                    entry.octant = Some(ROOT_INDEX);
                }
                self.octant_mut(ROOT_INDEX).drawables.push(key);
                self.queue_update(key);
            }
            stack.extend(children.iter().flatten());
        }
    }

    fn octant_mut(&mut self, index: OctantIndex) -> &mut Octant {
        &mut self.octants[index]
    }

    // ===== QUERIES =====

    /// Run a volume query over the tree
    pub fn get_drawables<Q: OctreeQuery + ?Sized>(&self, query: &mut Q) {
        self.get_drawables_internal(ROOT_INDEX, query, false);
    }

    fn get_drawables_internal<Q: OctreeQuery + ?Sized>(&self, index: OctantIndex, query: &mut Q, mut inside: bool) {
        let octant = self.octant(index);

        if index != ROOT_INDEX {
            match query.test_octant(&octant.culling_box, inside) {
                Intersection::Inside => inside = true,
                Intersection::Outside => return,
                Intersection::Intersects => {}
            }
        }

        if !octant.drawables.is_empty() {
            let mut drawables = octant.drawables.iter().filter_map(|key| {
                self.drawables
                    .get(*key)
                    .and_then(|entry| entry.object.as_deref())
                    .map(|object| (*key, object.as_drawable()))
            });
            query.test_drawables(&mut drawables, inside);
        }

        for child in octant.children.iter().flatten() {
            self.get_drawables_internal(*child, query, inside);
        }
    }

    /// All ray hits, sorted by increasing distance
    pub fn raycast(&self, query: &RayOctreeQuery, results: &mut Vec<RayQueryResult>) {
        results.clear();
        self.raycast_internal(ROOT_INDEX, query, results);
        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    }

    fn raycast_internal(&self, index: OctantIndex, query: &RayOctreeQuery, results: &mut Vec<RayQueryResult>) {
        let octant = self.octant(index);
        if index != ROOT_INDEX && query.ray.hit_distance_box(&octant.culling_box) >= query.max_distance {
            return;
        }

        for key in &octant.drawables {
            if let Some(drawable) = self.drawable(*key) {
                if query.accepts(drawable) {
                    drawable.process_ray_query(*key, query, results);
                }
            }
        }

        for child in octant.children.iter().flatten() {
            self.raycast_internal(*child, query, results);
        }
    }

    /// Closest ray hit only. Candidates are tested in order of their bounds
    /// hit distance, stopping once no remaining bound can beat the best hit.
    pub fn raycast_single(&self, query: &RayOctreeQuery, results: &mut Vec<RayQueryResult>) {
        results.clear();

        let mut candidates: Vec<(f32, DrawableKey, &dyn Drawable)> = Vec::new();
        self.collect_ray_candidates(ROOT_INDEX, query, &mut candidates);
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut closest_hit = f32::INFINITY;
        for (bounds_distance, key, drawable) in candidates {
            if bounds_distance >= closest_hit.min(query.max_distance) {
                break;
            }
            let old_len = results.len();
            drawable.process_ray_query(key, query, results);
            for hit in &results[old_len..] {
                closest_hit = closest_hit.min(hit.distance);
            }
        }

        if results.len() > 1 {
            results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
            results.truncate(1);
        }
    }

    fn collect_ray_candidates<'a>(
        &'a self,
        index: OctantIndex,
        query: &RayOctreeQuery,
        candidates: &mut Vec<(f32, DrawableKey, &'a dyn Drawable)>,
    ) {
        let octant = self.octant(index);
        if index != ROOT_INDEX && query.ray.hit_distance_box(&octant.culling_box) >= query.max_distance {
            return;
        }

        for key in &octant.drawables {
            if let Some(drawable) = self.drawable(*key) {
                if query.accepts(drawable) {
                    let distance = query.ray.hit_distance_box(&drawable.world_bounding_box());
                    candidates.push((distance, *key, drawable));
                }
            }
        }

        for child in octant.children.iter().flatten() {
            self.collect_ray_candidates(*child, query, candidates);
        }
    }
}

#[cfg(test)]
#[path = "octree_tests.rs"]
mod tests;
